use std::sync::Arc;

use rankit_live::core::quiz::{Question, Quiz, QuizStatus};
use rankit_live::core::room::{JoinOutcome, Room, RoomStatus};
use rankit_live::core::rank_players;
use rankit_live::error::{ErrorKind, RankitError};

fn quiz_with_answers(correct: &[u8]) -> Arc<Quiz> {
    Arc::new(Quiz {
        id: "quiz-1".to_string(),
        teacher_id: "teacher-1".to_string(),
        title: "Room test quiz".to_string(),
        status: QuizStatus::Published,
        questions: correct
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Question::new(
                    format!("q{}", i + 1),
                    format!("Question {}", i + 1),
                    ["a", "b", "c", "d"],
                    *c,
                )
            })
            .collect(),
    })
}

fn new_room(correct: &[u8]) -> Room {
    Room::new(
        "ABC234".to_string(),
        "teacher-1".to_string(),
        quiz_with_answers(correct),
    )
}

async fn admit(room: &Room, session_id: &str, nickname: &str) {
    let outcome = room.join_request(session_id, nickname).await.unwrap();
    assert!(matches!(outcome, JoinOutcome::Pending(_)));
    room.approve_player(session_id).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_nickname_rejected() {
    let room = new_room(&[0]);
    room.join_request("s1", "Ana").await.unwrap();

    // pending nicknames are reserved too, regardless of case
    let err = room.join_request("s2", "ana").await.unwrap_err();
    assert!(matches!(err, RankitError::NicknameTaken(_)));
    assert_eq!(err.kind(), ErrorKind::StateConflict);

    room.approve_player("s1").await.unwrap();
    assert!(room.join_request("s3", "Ana").await.is_err());
    assert_eq!(room.pending_players().await.len(), 0);
}

#[tokio::test]
async fn test_join_after_start_only_reconnects() {
    let room = new_room(&[0, 1]);
    admit(&room, "s1", "ana").await;
    room.next_question().await.unwrap();

    let err = room.join_request("s2", "bob").await.unwrap_err();
    assert!(matches!(err, RankitError::RoomAlreadyStarted));

    room.mark_disconnected("s1").await;
    let outcome = room.join_request("s1", "ignored").await.unwrap();
    match outcome {
        JoinOutcome::Reconnected(player) => {
            assert!(player.connected);
            assert_eq!(player.nickname, "ana");
        }
        other => panic!("expected reconnect, got {:?}", other),
    }
    assert_eq!(room.status().await, RoomStatus::Open);
}

#[tokio::test]
async fn test_reveal_twice_fails_without_double_award() {
    let room = new_room(&[2, 0]);
    admit(&room, "s1", "ana").await;
    room.next_question().await.unwrap();
    room.submit_answer("s1", 2).await.unwrap();

    room.reveal().await.unwrap();
    assert_eq!(room.player("s1").await.unwrap().score, 10);

    let err = room.reveal().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(room.player("s1").await.unwrap().score, 10);
}

#[tokio::test]
async fn test_exactly_correct_answers_score() {
    let room = new_room(&[3]);
    let ids = ["p1", "p2", "p3", "p4", "p5"];
    for id in ids {
        admit(&room, id, id).await;
    }
    room.next_question().await.unwrap();
    room.submit_answer("p1", 3).await.unwrap();
    room.submit_answer("p2", 0).await.unwrap();
    room.submit_answer("p3", 3).await.unwrap();
    // p4 changes their mind; last write wins
    room.submit_answer("p4", 3).await.unwrap();
    room.submit_answer("p4", 1).await.unwrap();

    room.reveal().await.unwrap();

    let scores: Vec<(String, u32)> = rank_players(room.leaderboard().await)
        .into_iter()
        .map(|p| (p.id, p.score))
        .collect();
    assert_eq!(
        scores,
        vec![
            ("p1".to_string(), 10),
            ("p3".to_string(), 10),
            ("p2".to_string(), 0),
            ("p4".to_string(), 0),
            ("p5".to_string(), 0),
        ]
    );
}

#[tokio::test]
async fn test_submit_rules() {
    let room = new_room(&[0]);
    admit(&room, "s1", "ana").await;

    assert!(matches!(
        room.submit_answer("s1", 0).await,
        Err(RankitError::QuestionNotOpen)
    ));

    room.next_question().await.unwrap();
    assert!(matches!(
        room.submit_answer("ghost", 0).await,
        Err(RankitError::PlayerNotFound(_))
    ));
    assert!(matches!(
        room.submit_answer("s1", 4).await,
        Err(RankitError::ValidationError(_))
    ));
    assert_eq!(room.snapshot().await.answers_count, 0);
}

#[tokio::test]
async fn test_walks_through_every_question_then_finishes() {
    let correct = [0, 1, 2];
    let room = new_room(&correct);

    for (i, _) in correct.iter().enumerate() {
        let snapshot = room.next_question().await.unwrap();
        assert_eq!(snapshot.status, RoomStatus::Open);
        assert_eq!(snapshot.current_question_index, i as i64);
        room.reveal().await.unwrap();
    }

    let finished = room.next_question().await.unwrap();
    assert_eq!(finished.status, RoomStatus::Finished);

    assert!(matches!(
        room.next_question().await,
        Err(RankitError::GameFinished)
    ));
    assert!(matches!(room.reveal().await, Err(RankitError::GameFinished)));
    assert_eq!(room.status().await, RoomStatus::Finished);
}

#[tokio::test]
async fn test_empty_quiz_finishes_immediately() {
    let room = new_room(&[]);
    let snapshot = room.next_question().await.unwrap();
    assert_eq!(snapshot.status, RoomStatus::Finished);
    assert_eq!(snapshot.total_questions, 0);
    assert!(snapshot.current_question.is_none());
}

#[tokio::test]
async fn test_snapshot_hides_answer_while_open() {
    let room = new_room(&[1, 3]);

    let lobby = room.snapshot().await;
    assert_eq!(lobby.current_question_index, -1);
    assert!(lobby.current_question.is_none());

    for expected in [1u8, 3u8] {
        let open = room.next_question().await.unwrap();
        let question = open.current_question.as_ref().unwrap();
        assert_eq!(question.correct_index, None);
        assert_eq!(open.correct_index, None);

        let json = serde_json::to_value(&open).unwrap();
        assert!(!json.to_string().contains("correctIndex"));

        let revealed = room.reveal().await.unwrap().snapshot;
        assert_eq!(revealed.correct_index, Some(expected));
        assert_eq!(
            revealed.current_question.unwrap().correct_index,
            Some(expected)
        );
        assert_eq!(room.snapshot().await.correct_index, Some(expected));
    }
}

#[tokio::test]
async fn test_two_question_scenario() {
    let room = new_room(&[1, 0]);
    admit(&room, "a", "Alice").await;
    admit(&room, "b", "Bruno").await;

    room.next_question().await.unwrap();
    room.submit_answer("a", 1).await.unwrap();
    room.submit_answer("b", 0).await.unwrap();
    room.reveal().await.unwrap();
    assert_eq!(room.player("a").await.unwrap().score, 10);
    assert_eq!(room.player("b").await.unwrap().score, 0);

    let second = room.next_question().await.unwrap();
    assert_eq!(second.answers_count, 0);
    assert_eq!(second.current_question_index, 1);
    room.submit_answer("b", 0).await.unwrap();
    room.reveal().await.unwrap();
    assert_eq!(room.player("a").await.unwrap().score, 10);
    assert_eq!(room.player("b").await.unwrap().score, 10);

    let finished = room.next_question().await.unwrap();
    assert_eq!(finished.status, RoomStatus::Finished);

    let leaderboard: Vec<(String, u32)> = rank_players(room.leaderboard().await)
        .into_iter()
        .map(|p| (p.nickname, p.score))
        .collect();
    assert_eq!(
        leaderboard,
        vec![("Alice".to_string(), 10), ("Bruno".to_string(), 10)]
    );
}

#[tokio::test]
async fn test_unknown_target_leaves_room_untouched() {
    let room = new_room(&[0]);
    admit(&room, "s1", "ana").await;
    room.join_request("s2", "bob").await.unwrap();

    assert!(matches!(
        room.kick_player("nobody").await,
        Err(RankitError::PlayerNotFound(_))
    ));
    assert!(matches!(
        room.approve_player("nobody").await,
        Err(RankitError::PendingPlayerNotFound(_))
    ));
    let err = room.reject_player("nobody").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(room.leaderboard().await.len(), 1);
    assert_eq!(room.pending_players().await.len(), 1);
}
