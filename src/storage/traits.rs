//! Interfaces to the collaborators the engine does not own
//!
//! Quizzes are read from a repository; finished rooms are handed to a
//! history sink. Both are async traits so database or HTTP backends can be
//! plugged in without touching the engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::quiz::Quiz;
use crate::core::room::{QuestionResult, RoomStatus};
use crate::error::Result;

/// Final standing of one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_id: String,
    pub nickname: String,
    pub score: u32,
    pub correct_count: u32,
    pub rank: usize,
}

/// Archived summary of a finished room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomHistory {
    pub id: String,
    pub room_code: String,
    pub teacher_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub status: RoomStatus,
    pub total_questions: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub players: Vec<PlayerStats>,
    pub questions: Vec<QuestionResult>,
}

/// Read-only quiz lookup
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Find a quiz by id; `Ok(None)` when it does not exist
    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Arc<Quiz>>>;
}

/// Durable storage for finished rooms
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn save_history(&self, history: &RoomHistory) -> Result<()>;
}
