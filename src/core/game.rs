//! Game orchestration: client and teacher actions become room transitions
//! and outbound events.
//!
//! The service keeps no state of its own beyond handles to the room
//! registry, the quiz repository, the hub and the archiver.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use crate::core::archive::{build_history, ArchiverHandle};
use crate::core::connection::ConnectionInfo;
use crate::core::hub::{EventDispatcher, HubHandle};
use crate::core::message_types::{ClientEvent, ModerationAction, ServerEvent};
use crate::core::room::{JoinOutcome, Player, Room, RoomManager, RoomStateSnapshot, RoomStatus};
use crate::error::{ErrorKind, RankitError, Result};
use crate::storage::traits::QuizRepository;

/// Order players by score, highest first; ties go to whoever joined first
pub fn rank_players(mut players: Vec<Player>) -> Vec<Player> {
    players.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.join_order.cmp(&b.join_order))
    });
    players
}

pub struct GameService {
    rooms: Arc<RoomManager>,
    quizzes: Arc<dyn QuizRepository>,
    hub: HubHandle,
    archiver: ArchiverHandle,
}

impl GameService {
    pub fn new(
        rooms: Arc<RoomManager>,
        quizzes: Arc<dyn QuizRepository>,
        hub: HubHandle,
        archiver: ArchiverHandle,
    ) -> Self {
        Self {
            rooms,
            quizzes,
            hub,
            archiver,
        }
    }

    pub fn rooms(&self) -> &Arc<RoomManager> {
        &self.rooms
    }

    /// Start a room from one of the teacher's published quizzes
    pub async fn create_room(&self, teacher_id: &str, quiz_id: &str) -> Result<Arc<Room>> {
        if teacher_id.trim().is_empty() {
            return Err(RankitError::ValidationError(
                "teacherId is required".to_string(),
            ));
        }

        let quiz = self
            .quizzes
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| RankitError::QuizNotFound(quiz_id.to_string()))?;

        if quiz.teacher_id != teacher_id {
            return Err(RankitError::QuizNotOwned);
        }
        if !quiz.is_published() {
            return Err(RankitError::QuizNotPublished);
        }

        let room = self.rooms.create_room(teacher_id.to_string(), quiz).await;
        info!(
            "Room {} created by teacher {} for quiz {} ({} questions)",
            room.code(),
            teacher_id,
            quiz_id,
            room.quiz().question_count()
        );
        Ok(room)
    }

    pub async fn room_state(&self, room_code: &str) -> Result<RoomStateSnapshot> {
        let room = self.rooms.get_room(room_code).await?;
        Ok(room.snapshot().await)
    }

    /// Close a room on the teacher's request
    pub async fn delete_room(&self, room_code: &str, teacher_id: &str) -> Result<()> {
        let room = self.authorized_room(room_code, teacher_id).await?;
        self.rooms.remove_room(room.code()).await;
        self.hub.broadcast_to_room(
            room.code(),
            &ServerEvent::Error("The room was closed by the teacher".to_string()),
        );
        info!("Room {} deleted by teacher {}", room.code(), teacher_id);
        Ok(())
    }

    pub async fn join_room(
        &self,
        room_code: &str,
        nickname: &str,
        session_id: &str,
    ) -> Result<JoinOutcome> {
        let room = self.rooms.get_room(room_code).await?;
        let outcome = room.join_request(session_id, nickname).await?;

        match &outcome {
            JoinOutcome::Reconnected(player) => {
                info!("Player {} reconnected to room {}", player.nickname, room.code());
                self.hub
                    .broadcast_to_room(room.code(), &ServerEvent::PlayerJoined(player.clone()));
                self.hub.send_to_player(
                    session_id,
                    &ServerEvent::RoomState(room.snapshot().await),
                );
            }
            JoinOutcome::Pending(player) => {
                debug!(
                    "Player {} waiting for approval in room {}",
                    player.nickname,
                    room.code()
                );
                self.hub.broadcast_to_room(
                    room.code(),
                    &ServerEvent::PlayerRequestEntry {
                        nickname: player.nickname.clone(),
                        connection_id: session_id.to_string(),
                    },
                );
                self.hub.send_to_player(
                    session_id,
                    &ServerEvent::EntryPending("Waiting for the teacher's approval".to_string()),
                );
            }
        }

        Ok(outcome)
    }

    pub async fn moderate_entry(
        &self,
        room_code: &str,
        teacher_id: &str,
        target_session_id: &str,
        action: ModerationAction,
    ) -> Result<()> {
        let room = self.authorized_room(room_code, teacher_id).await?;

        match action {
            ModerationAction::Accept => {
                let player = room.approve_player(target_session_id).await?;
                info!("Player {} admitted to room {}", player.nickname, room.code());
                self.hub
                    .broadcast_to_room(room.code(), &ServerEvent::PlayerJoined(player));
                self.hub.send_to_player(
                    target_session_id,
                    &ServerEvent::RoomState(room.snapshot().await),
                );
            }
            ModerationAction::Reject => {
                let player = room.reject_player(target_session_id).await?;
                info!("Player {} turned away from room {}", player.nickname, room.code());
                self.hub.send_to_player(
                    target_session_id,
                    &ServerEvent::Error("Entry denied by the teacher".to_string()),
                );
            }
        }

        Ok(())
    }

    pub async fn kick_player(
        &self,
        room_code: &str,
        teacher_id: &str,
        target_session_id: &str,
    ) -> Result<Player> {
        let room = self.authorized_room(room_code, teacher_id).await?;
        let player = room.kick_player(target_session_id).await?;
        info!("Player {} kicked from room {}", player.nickname, room.code());

        self.hub.send_to_player(
            target_session_id,
            &ServerEvent::Error("You were removed from the room by the teacher".to_string()),
        );
        self.broadcast_leaderboard(&room).await;
        Ok(player)
    }

    /// Advance to the next question; finishing the quiz triggers archiving
    pub async fn open_question(
        &self,
        room_code: &str,
        teacher_id: &str,
    ) -> Result<RoomStateSnapshot> {
        let room = self.authorized_room(room_code, teacher_id).await?;
        let snapshot = room.next_question().await?;

        self.hub
            .broadcast_to_room(room.code(), &ServerEvent::QuestionOpened(snapshot.clone()));

        if snapshot.status == RoomStatus::Finished {
            info!("Room {} finished", room.code());
            self.broadcast_leaderboard(&room).await;
            self.archive(&room).await;
        } else {
            debug!(
                "Room {} opened question {}/{}",
                room.code(),
                snapshot.current_question_index + 1,
                snapshot.total_questions
            );
        }

        Ok(snapshot)
    }

    /// Record a student's answer; only the running count is broadcast
    pub async fn submit_answer(
        &self,
        room_code: &str,
        player_id: &str,
        answer_index: u8,
    ) -> Result<usize> {
        let room = self.rooms.get_room(room_code).await?;
        let answers_count = room.submit_answer(player_id, answer_index).await?;

        self.hub.broadcast_to_room(
            room.code(),
            &ServerEvent::AnswerSubmitted { answers_count },
        );
        Ok(answers_count)
    }

    pub async fn reveal_question(
        &self,
        room_code: &str,
        teacher_id: &str,
    ) -> Result<RoomStateSnapshot> {
        let room = self.authorized_room(room_code, teacher_id).await?;
        let outcome = room.reveal().await?;
        debug!(
            "Room {} revealed question {}: {} correct",
            room.code(),
            outcome.result.question_index,
            outcome.result.correct_count
        );

        self.hub.broadcast_to_room(
            room.code(),
            &ServerEvent::QuestionRevealed(outcome.snapshot.clone()),
        );
        self.hub.broadcast_to_room(
            room.code(),
            &ServerEvent::LeaderboardUpdate(rank_players(outcome.leaderboard)),
        );
        Ok(outcome.snapshot)
    }

    /// The session's last connection went away
    pub async fn player_disconnected(&self, room_code: &str, session_id: &str) {
        let Ok(room) = self.rooms.get_room(room_code).await else {
            return;
        };
        if room.mark_disconnected(session_id).await {
            debug!("Player {} disconnected from room {}", session_id, room.code());
            self.broadcast_leaderboard(&room).await;
        }
    }

    async fn authorized_room(&self, room_code: &str, teacher_id: &str) -> Result<Arc<Room>> {
        let room = self.rooms.get_room(room_code).await?;
        if !room.is_owned_by(teacher_id) {
            return Err(RankitError::NotRoomTeacher);
        }
        Ok(room)
    }

    async fn broadcast_leaderboard(&self, room: &Room) {
        let leaderboard = rank_players(room.leaderboard().await);
        self.hub
            .broadcast_to_room(room.code(), &ServerEvent::LeaderboardUpdate(leaderboard));
    }

    /// Hand the finished room to the archiver; never fails the caller
    async fn archive(&self, room: &Room) {
        let record = build_history(room).await;
        match self.archiver.submit(record) {
            Ok(()) => debug!("Room {} queued for archiving", room.code()),
            Err(e) => error!("Failed to queue room {} for archiving: {}", room.code(), e),
        }
    }
}

#[async_trait]
impl EventDispatcher for GameService {
    async fn dispatch(&self, origin: ConnectionInfo, event: ClientEvent) {
        let name = event.name();
        let room_code = origin.room_code.as_str();

        let result = match event {
            ClientEvent::JoinRoom { nickname } => self
                .join_room(room_code, &nickname, &origin.session_id)
                .await
                .map(|_| ()),
            ClientEvent::TeacherModerateEntry {
                teacher_id,
                connection_id,
                action,
            } => {
                self.moderate_entry(room_code, &teacher_id, &connection_id, action)
                    .await
            }
            ClientEvent::TeacherKickPlayer {
                teacher_id,
                connection_id,
            } => self
                .kick_player(room_code, &teacher_id, &connection_id)
                .await
                .map(|_| ()),
            ClientEvent::TeacherOpenQuestion { teacher_id } => self
                .open_question(room_code, &teacher_id)
                .await
                .map(|_| ()),
            ClientEvent::SubmitAnswer { answer_index } => self
                .submit_answer(room_code, &origin.session_id, answer_index)
                .await
                .map(|_| ()),
            ClientEvent::TeacherReveal { teacher_id } => self
                .reveal_question(room_code, &teacher_id)
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            match e.kind() {
                ErrorKind::Authorization => warn!(
                    "Unauthorized {} in room {} from connection {}",
                    name, room_code, origin.connection_id
                ),
                ErrorKind::Internal => error!("{} in room {} failed: {}", name, room_code, e),
                _ => debug!("{} in room {} rejected: {}", name, room_code, e),
            }
            self.hub
                .send_to_connection(&origin.connection_id, &ServerEvent::Error(e.to_string()));
        }
    }

    async fn connection_closed(&self, origin: ConnectionInfo) {
        self.player_disconnected(&origin.room_code, &origin.session_id)
            .await;
    }
}
