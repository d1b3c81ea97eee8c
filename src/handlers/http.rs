//! HTTP surface: room management endpoints and the WebSocket entry point
//!
//! | Method | Path              | Purpose                                  |
//! |--------|-------------------|------------------------------------------|
//! | POST   | `/rooms`          | create a room from a published quiz      |
//! | GET    | `/rooms/{code}`   | current room snapshot                    |
//! | DELETE | `/rooms/{code}`   | close a room (`x-teacher-id` header)     |
//! | GET    | `/ws/{code}`      | WebSocket upgrade, `?session=` to resume |
//! | GET    | `/health`         | liveness probe                           |

use std::convert::Infallible;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use crate::constants::{ROOMS_PATH, WS_PATH};
use crate::core::room::RoomStateSnapshot;
use crate::core::server::SharedServerManager;
use crate::error::{ErrorKind, RankitError};
use crate::handlers::websocket::handle_ws_client;

const MAX_BODY_SIZE: u64 = 16 * 1024;
const MAX_SESSION_ID_LENGTH: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub teacher_id: String,
    pub quiz_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreated {
    pub room_code: String,
    pub state: RoomStateSnapshot,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn status_for(error: &RankitError) -> StatusCode {
    match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::StateConflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_reply(error: &RankitError) -> Response {
    let body = ErrorBody {
        error: error.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status_for(error)).into_response()
}

/// Accept a client-supplied session id only if it is a sane token
fn resolve_session(requested: Option<String>) -> String {
    requested
        .map(|s| s.trim().to_string())
        .filter(|s| {
            !s.is_empty()
                && s.len() <= MAX_SESSION_ID_LENGTH
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn with_server(
    server: SharedServerManager,
) -> impl Filter<Extract = (SharedServerManager,), Error = Infallible> + Clone {
    warp::any().map(move || server.clone())
}

/// Every route the server exposes
pub fn routes(
    server: SharedServerManager,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let ws_route = warp::path(WS_PATH)
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::query::<WsQuery>())
        .and(with_server(server.clone()))
        .and_then(ws_upgrade);

    let create_route = warp::path(ROOMS_PATH)
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_SIZE))
        .and(warp::body::json())
        .and(with_server(server.clone()))
        .and_then(create_room);

    let get_route = warp::path(ROOMS_PATH)
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_server(server.clone()))
        .and_then(get_room);

    let delete_route = warp::path(ROOMS_PATH)
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(warp::header::optional::<String>("x-teacher-id"))
        .and(with_server(server))
        .and_then(delete_room);

    let health_route = warp::path("health")
        .and(warp::path::end())
        .map(|| "OK");

    ws_route
        .or(create_route)
        .or(get_route)
        .or(delete_route)
        .or(health_route)
}

async fn ws_upgrade(
    room_code: String,
    ws: warp::ws::Ws,
    query: WsQuery,
    server: SharedServerManager,
) -> Result<Response, Rejection> {
    let room = match server.rooms().get_room(&room_code).await {
        Ok(room) => room,
        Err(e) => {
            debug!("Refusing WebSocket upgrade: {}", e);
            return Ok(error_reply(&e));
        }
    };

    let code = room.code().to_string();
    let session_id = resolve_session(query.session);
    let max_message_size = server.config().max_message_size;

    info!("New websocket connection for room {}", code);
    Ok(ws
        .max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_ws_client(socket, server, code, session_id))
        .into_response())
}

async fn create_room(
    request: CreateRoomRequest,
    server: SharedServerManager,
) -> Result<Response, Rejection> {
    let room = match server
        .game()
        .create_room(&request.teacher_id, &request.quiz_id)
        .await
    {
        Ok(room) => room,
        Err(e) => return Ok(error_reply(&e)),
    };

    let body = RoomCreated {
        room_code: room.code().to_string(),
        state: room.snapshot().await,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), StatusCode::CREATED).into_response())
}

async fn get_room(room_code: String, server: SharedServerManager) -> Result<Response, Rejection> {
    match server.game().room_state(&room_code).await {
        Ok(snapshot) => Ok(warp::reply::json(&snapshot).into_response()),
        Err(e) => Ok(error_reply(&e)),
    }
}

async fn delete_room(
    room_code: String,
    teacher_id: Option<String>,
    server: SharedServerManager,
) -> Result<Response, Rejection> {
    let teacher_id = teacher_id.unwrap_or_default();
    match server.game().delete_room(&room_code, &teacher_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Ok(error_reply(&e)),
    }
}
