//! In-memory collaborators for development and testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::*;
use crate::core::quiz::Quiz;
use crate::error::Result;

/// Quiz store backed by a map
pub struct MemoryQuizStore {
    quizzes: RwLock<HashMap<String, Arc<Quiz>>>,
}

impl MemoryQuizStore {
    pub fn new() -> Self {
        Self {
            quizzes: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_quizzes(quizzes: Vec<Quiz>) -> Self {
        let map = quizzes
            .into_iter()
            .map(|q| (q.id.clone(), Arc::new(q)))
            .collect();
        Self {
            quizzes: RwLock::new(map),
        }
    }

    pub async fn insert(&self, quiz: Quiz) {
        self.quizzes
            .write()
            .await
            .insert(quiz.id.clone(), Arc::new(quiz));
    }

    pub async fn len(&self) -> usize {
        self.quizzes.read().await.len()
    }
}

impl Default for MemoryQuizStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuizRepository for MemoryQuizStore {
    async fn find_quiz(&self, quiz_id: &str) -> Result<Option<Arc<Quiz>>> {
        Ok(self.quizzes.read().await.get(quiz_id).cloned())
    }
}

/// History store keyed by room code; archiving a room twice keeps the latest
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<String, RoomHistory>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, room_code: &str) -> Option<RoomHistory> {
        self.records.read().await.get(room_code).cloned()
    }

    pub async fn list_by_teacher(&self, teacher_id: &str) -> Vec<RoomHistory> {
        let mut records: Vec<RoomHistory> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.teacher_id == teacher_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        records
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistorySink for MemoryHistoryStore {
    async fn save_history(&self, history: &RoomHistory) -> Result<()> {
        self.records
            .write()
            .await
            .insert(history.room_code.clone(), history.clone());
        Ok(())
    }
}
