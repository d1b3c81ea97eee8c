//! Event types exchanged with clients
//!
//! Every frame is an envelope `{"type": ..., "payload": ...}`; payload field
//! names are camelCase.

use serde::{Deserialize, Serialize};

use crate::core::room::{Player, RoomStateSnapshot};

/// Teacher decision on a pending join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationAction {
    Accept,
    Reject,
}

/// Client-to-server events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Ask to join the connection's room
    JoinRoom { nickname: String },

    #[serde(rename_all = "camelCase")]
    TeacherModerateEntry {
        teacher_id: String,
        /// Session id of the student being moderated
        connection_id: String,
        action: ModerationAction,
    },

    #[serde(rename_all = "camelCase")]
    TeacherKickPlayer {
        teacher_id: String,
        connection_id: String,
    },

    #[serde(rename_all = "camelCase")]
    TeacherOpenQuestion { teacher_id: String },

    #[serde(rename_all = "camelCase")]
    SubmitAnswer { answer_index: u8 },

    #[serde(rename_all = "camelCase")]
    TeacherReveal { teacher_id: String },
}

impl ClientEvent {
    /// Wire name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::TeacherModerateEntry { .. } => "teacher_moderate_entry",
            Self::TeacherKickPlayer { .. } => "teacher_kick_player",
            Self::TeacherOpenQuestion { .. } => "teacher_open_question",
            Self::SubmitAnswer { .. } => "submit_answer",
            Self::TeacherReveal { .. } => "teacher_reveal",
        }
    }
}

/// Server-to-client events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First frame on every connection
    #[serde(rename_all = "camelCase")]
    Connected {
        session_id: String,
        room_code: String,
    },

    /// A student is waiting for approval (teacher filters by type)
    #[serde(rename_all = "camelCase")]
    PlayerRequestEntry {
        nickname: String,
        connection_id: String,
    },

    PlayerJoined(Player),

    EntryPending(String),

    RoomState(RoomStateSnapshot),

    QuestionOpened(RoomStateSnapshot),

    #[serde(rename_all = "camelCase")]
    AnswerSubmitted { answers_count: usize },

    QuestionRevealed(RoomStateSnapshot),

    LeaderboardUpdate(Vec<Player>),

    Error(String),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::PlayerRequestEntry { .. } => "player_request_entry",
            Self::PlayerJoined(_) => "player_joined",
            Self::EntryPending(_) => "entry_pending",
            Self::RoomState(_) => "room_state",
            Self::QuestionOpened(_) => "question_opened",
            Self::AnswerSubmitted { .. } => "answer_submitted",
            Self::QuestionRevealed(_) => "question_revealed",
            Self::LeaderboardUpdate(_) => "leaderboard_update",
            Self::Error(_) => "error",
        }
    }
}
