use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::connection::{Connection, OutboundMessage};
use crate::core::hub::{encode_event, HubHandle};
use crate::core::message_types::{ClientEvent, ServerEvent};
use crate::core::server::SharedServerManager;

// Pump one WebSocket connection between the client and the hub
pub async fn handle_ws_client(
    ws: WebSocket,
    server: SharedServerManager,
    room_code: String,
    session_id: String,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(server.config().outbound_queue);
    let hub = server.hub().clone();

    let connection = Connection::new(room_code.clone(), session_id.clone(), tx);
    let connection_id = connection.id().to_string();

    // Queued before registration so it is always the first frame
    let greeting = ServerEvent::Connected {
        session_id: session_id.clone(),
        room_code: room_code.clone(),
    };
    if let Some(message) = encode_event(&greeting) {
        if connection.try_enqueue(message).is_err() {
            warn!("Could not queue greeting for connection {}", connection_id);
        }
    }

    if let Err(e) = hub.register(connection) {
        error!("Failed to register connection {}: {}", connection_id, e);
        return;
    }
    info!(
        "Client connected: {} (room {}, session {})",
        connection_id, room_code, session_id
    );

    // Forward queued frames to the socket. Ends once the hub drops the
    // connection, which closes the queue.
    let writer_id = connection_id.clone();
    tokio::task::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_tx.send(Message::text(&*message)).await {
                debug!("Write to connection {} failed: {}", writer_id, e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(msg) => {
                if msg.is_close() {
                    break;
                }
                // Only text frames carry events
                if msg.is_text() {
                    process_message(msg, &connection_id, &hub);
                }
            }
            Err(e) => {
                warn!("WebSocket error on connection {}: {}", connection_id, e);
                break;
            }
        }
    }

    if let Err(e) = hub.unregister(&connection_id) {
        error!("Error unregistering connection {}: {}", connection_id, e);
    }
    info!("Client disconnected: {}", connection_id);
}

// Decode one text frame and hand it to the hub; malformed frames are dropped
fn process_message(msg: Message, connection_id: &str, hub: &HubHandle) {
    let text = match msg.to_str() {
        Ok(s) => s,
        Err(_) => {
            warn!("Failed to extract text from message on {}", connection_id);
            return;
        }
    };

    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => {
            debug!("{} from connection {}", event.name(), connection_id);
            if let Err(e) = hub.inbound(connection_id, event) {
                error!("Failed to forward event from {}: {}", connection_id, e);
            }
        }
        Err(e) => {
            warn!("Dropping malformed message from {}: {}", connection_id, e);
        }
    }
}
