use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;

use rankit_live::config::ServerConfig;
use rankit_live::core::connection::{Connection, OutboundMessage};
use rankit_live::core::message_types::{ClientEvent, ModerationAction};
use rankit_live::core::quiz::{Question, Quiz, QuizStatus};
use rankit_live::core::room::RoomStatus;
use rankit_live::core::ServerManager;
use rankit_live::error::RankitError;
use rankit_live::storage::{MemoryHistoryStore, MemoryQuizStore};

const TEACHER: &str = "teacher-1";

fn quiz(id: &str, status: QuizStatus, correct: &[u8]) -> Quiz {
    Quiz {
        id: id.to_string(),
        teacher_id: TEACHER.to_string(),
        title: format!("Quiz {}", id),
        status,
        questions: correct
            .iter()
            .enumerate()
            .map(|(i, c)| Question::new(format!("{}-q{}", id, i), "Pick one", ["a", "b", "c", "d"], *c))
            .collect(),
    }
}

fn start() -> (ServerManager, Arc<MemoryHistoryStore>) {
    let quizzes = MemoryQuizStore::with_quizzes(vec![
        quiz("two", QuizStatus::Published, &[1, 0]),
        quiz("draft", QuizStatus::Draft, &[0]),
    ]);
    let history = Arc::new(MemoryHistoryStore::new());
    let config = ServerConfig {
        archive_retry_delay: Duration::from_millis(1),
        ..ServerConfig::default()
    };
    let server = ServerManager::start(config, Arc::new(quizzes), history.clone());
    (server, history)
}

struct Client {
    id: String,
    rx: mpsc::Receiver<OutboundMessage>,
}

fn connect(server: &ServerManager, room_code: &str, session_id: &str) -> Client {
    let (tx, rx) = mpsc::channel(64);
    let connection = Connection::new(room_code.to_string(), session_id.to_string(), tx);
    let id = connection.id().to_string();
    server.hub().register(connection).unwrap();
    Client { id, rx }
}

impl Client {
    fn send(&self, server: &ServerManager, event: ClientEvent) {
        server.hub().inbound(&self.id, event).unwrap();
    }

    /// Skip frames until one of the given type arrives; returns its payload
    async fn expect(&mut self, event_type: &str) -> Value {
        loop {
            let frame = timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {}", event_type))
                .expect("connection closed");
            let value: Value = serde_json::from_str(&frame).unwrap();
            if value["type"] == event_type {
                return value["payload"].clone();
            }
        }
    }
}

#[tokio::test]
async fn test_create_room_checks_quiz() {
    let (server, _) = start();
    let game = server.game();

    assert!(matches!(
        game.create_room(TEACHER, "missing").await,
        Err(RankitError::QuizNotFound(_))
    ));
    assert!(matches!(
        game.create_room("someone-else", "two").await,
        Err(RankitError::QuizNotOwned)
    ));
    assert!(matches!(
        game.create_room(TEACHER, "draft").await,
        Err(RankitError::QuizNotPublished)
    ));

    let room = game.create_room(TEACHER, "two").await.unwrap();
    assert_eq!(room.code().len(), 6);
    assert_eq!(room.status().await, RoomStatus::Lobby);
    assert!(server.rooms().contains(room.code()).await);
}

#[tokio::test]
async fn test_full_session_over_the_hub() {
    let (server, history) = start();
    let room = server.game().create_room(TEACHER, "two").await.unwrap();
    let code = room.code().to_string();

    let mut teacher = connect(&server, &code, "teacher-session");
    let mut alice = connect(&server, &code, "alice-session");
    let mut bruno = connect(&server, &code, "bruno-session");

    for (client, nickname) in [(&mut alice, "Alice"), (&mut bruno, "Bruno")] {
        client.send(
            &server,
            ClientEvent::JoinRoom {
                nickname: nickname.to_string(),
            },
        );
        client.expect("entry_pending").await;
        let request = teacher.expect("player_request_entry").await;
        assert_eq!(request["nickname"], nickname);
    }

    for session in ["alice-session", "bruno-session"] {
        teacher.send(
            &server,
            ClientEvent::TeacherModerateEntry {
                teacher_id: TEACHER.to_string(),
                connection_id: session.to_string(),
                action: ModerationAction::Accept,
            },
        );
        let joined = teacher.expect("player_joined").await;
        assert_eq!(joined["id"], session);
    }
    assert_eq!(alice.expect("room_state").await["status"], "LOBBY");
    assert_eq!(bruno.expect("room_state").await["playersCount"], 2);

    // Question 1: correct index 1
    teacher.send(
        &server,
        ClientEvent::TeacherOpenQuestion {
            teacher_id: TEACHER.to_string(),
        },
    );
    let opened = alice.expect("question_opened").await;
    assert_eq!(opened["status"], "OPEN");
    assert!(opened["currentQuestion"].get("correctIndex").is_none());
    bruno.expect("question_opened").await;

    alice.send(&server, ClientEvent::SubmitAnswer { answer_index: 1 });
    assert_eq!(teacher.expect("answer_submitted").await["answersCount"], 1);
    bruno.send(&server, ClientEvent::SubmitAnswer { answer_index: 0 });
    assert_eq!(teacher.expect("answer_submitted").await["answersCount"], 2);

    teacher.send(
        &server,
        ClientEvent::TeacherReveal {
            teacher_id: TEACHER.to_string(),
        },
    );
    assert_eq!(alice.expect("question_revealed").await["correctIndex"], 1);
    let board = alice.expect("leaderboard_update").await;
    assert_eq!(board[0]["nickname"], "Alice");
    assert_eq!(board[0]["score"], 10);
    assert_eq!(board[1]["score"], 0);

    // Question 2: correct index 0
    teacher.send(
        &server,
        ClientEvent::TeacherOpenQuestion {
            teacher_id: TEACHER.to_string(),
        },
    );
    assert_eq!(bruno.expect("question_opened").await["answersCount"], 0);
    alice.expect("question_opened").await;
    bruno.send(&server, ClientEvent::SubmitAnswer { answer_index: 0 });
    teacher.expect("answer_submitted").await;
    teacher.send(
        &server,
        ClientEvent::TeacherReveal {
            teacher_id: TEACHER.to_string(),
        },
    );
    teacher.expect("question_revealed").await;
    teacher.expect("leaderboard_update").await;

    // Past the last question
    teacher.send(
        &server,
        ClientEvent::TeacherOpenQuestion {
            teacher_id: TEACHER.to_string(),
        },
    );
    assert_eq!(alice.expect("question_opened").await["status"], "FINISHED");
    let final_board = alice.expect("leaderboard_update").await;
    let scores: Vec<(String, u64)> = final_board
        .as_array()
        .unwrap()
        .iter()
        .map(|p| {
            (
                p["nickname"].as_str().unwrap().to_string(),
                p["score"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        scores,
        vec![("Alice".to_string(), 10), ("Bruno".to_string(), 10)]
    );

    // Archived, then evicted
    for _ in 0..200 {
        if server.archiver().stats().archived == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let record = history.get(&code).await.expect("room archived");
    assert_eq!(record.players.len(), 2);
    assert_eq!(record.players[0].correct_count, 1);
    assert_eq!(record.questions.len(), 2);
    assert!(!server.rooms().contains(&code).await);
}

#[tokio::test]
async fn test_errors_go_to_the_sender_only() {
    let (server, _) = start();
    let room = server.game().create_room(TEACHER, "two").await.unwrap();
    let code = room.code().to_string();

    let mut teacher = connect(&server, &code, "teacher-session");
    let mut student = connect(&server, &code, "student-session");

    student.send(
        &server,
        ClientEvent::TeacherOpenQuestion {
            teacher_id: "impostor".to_string(),
        },
    );
    let message = student.expect("error").await;
    assert!(message.as_str().unwrap().contains("teacher"));
    assert_eq!(room.status().await, RoomStatus::Lobby);

    teacher.send(
        &server,
        ClientEvent::TeacherReveal {
            teacher_id: TEACHER.to_string(),
        },
    );
    let message = teacher.expect("error").await;
    assert!(message.as_str().unwrap().contains("LOBBY"));
    assert!(student.rx.try_recv().is_err());

    teacher.send(
        &server,
        ClientEvent::TeacherKickPlayer {
            teacher_id: TEACHER.to_string(),
            connection_id: "nobody".to_string(),
        },
    );
    assert!(teacher
        .expect("error")
        .await
        .as_str()
        .unwrap()
        .contains("nobody"));
}

#[tokio::test]
async fn test_reject_and_kick() {
    let (server, _) = start();
    let room = server.game().create_room(TEACHER, "two").await.unwrap();
    let code = room.code().to_string();

    let mut teacher = connect(&server, &code, "teacher-session");
    let mut eve = connect(&server, &code, "eve-session");
    let mut mallory = connect(&server, &code, "mallory-session");

    eve.send(&server, ClientEvent::JoinRoom { nickname: "Eve".into() });
    teacher.expect("player_request_entry").await;
    teacher.send(
        &server,
        ClientEvent::TeacherModerateEntry {
            teacher_id: TEACHER.to_string(),
            connection_id: "eve-session".to_string(),
            action: ModerationAction::Reject,
        },
    );
    assert_eq!(eve.expect("error").await, "Entry denied by the teacher");
    assert!(room.pending_players().await.is_empty());

    mallory.send(&server, ClientEvent::JoinRoom { nickname: "Mallory".into() });
    teacher.expect("player_request_entry").await;
    teacher.send(
        &server,
        ClientEvent::TeacherModerateEntry {
            teacher_id: TEACHER.to_string(),
            connection_id: "mallory-session".to_string(),
            action: ModerationAction::Accept,
        },
    );
    mallory.expect("room_state").await;

    teacher.send(
        &server,
        ClientEvent::TeacherKickPlayer {
            teacher_id: TEACHER.to_string(),
            connection_id: "mallory-session".to_string(),
        },
    );
    mallory.expect("error").await;
    let board = teacher.expect("leaderboard_update").await;
    assert_eq!(board.as_array().unwrap().len(), 0);
    assert!(room.player("mallory-session").await.is_none());
}

#[tokio::test]
async fn test_disconnect_updates_leaderboard() {
    let (server, _) = start();
    let room = server.game().create_room(TEACHER, "two").await.unwrap();
    let code = room.code().to_string();

    let mut teacher = connect(&server, &code, "teacher-session");
    let mut alice = connect(&server, &code, "alice-session");

    alice.send(&server, ClientEvent::JoinRoom { nickname: "Alice".into() });
    teacher.expect("player_request_entry").await;
    server
        .game()
        .moderate_entry(&code, TEACHER, "alice-session", ModerationAction::Accept)
        .await
        .unwrap();
    alice.expect("room_state").await;

    server.hub().unregister(&alice.id).unwrap();
    let board = teacher.expect("leaderboard_update").await;
    assert_eq!(board[0]["connected"], false);

    // Coming back on the same session flips the flag again
    let mut again = connect(&server, &code, "alice-session");
    again.send(&server, ClientEvent::JoinRoom { nickname: "Alice".into() });
    assert_eq!(teacher.expect("player_joined").await["connected"], true);
    assert_eq!(again.expect("room_state").await["playersCount"], 1);
}

#[tokio::test]
async fn test_delete_room_requires_owner() {
    let (server, _) = start();
    let room = server.game().create_room(TEACHER, "two").await.unwrap();
    let code = room.code().to_string();

    assert!(matches!(
        server.game().delete_room(&code, "impostor").await,
        Err(RankitError::NotRoomTeacher)
    ));
    server.game().delete_room(&code, TEACHER).await.unwrap();
    assert!(matches!(
        server.game().room_state(&code).await,
        Err(RankitError::RoomNotFound(_))
    ));
}
