//! File-backed collaborators used by the server binary

use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::traits::{HistorySink, RoomHistory};
use crate::core::quiz::Quiz;
use crate::error::{RankitError, Result};

/// Load a JSON array of quizzes, validating every question
pub async fn load_quizzes(path: impl AsRef<Path>) -> Result<Vec<Quiz>> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let quizzes: Vec<Quiz> = serde_json::from_str(&raw).map_err(|e| {
        RankitError::StorageError(format!("Invalid quiz file {}: {}", path.display(), e))
    })?;

    for quiz in &quizzes {
        quiz.validate()?;
    }

    info!("Loaded {} quizzes from {}", quizzes.len(), path.display());
    Ok(quizzes)
}

/// Appends one JSON document per finished room
pub struct FileHistorySink {
    path: PathBuf,
    // serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl FileHistorySink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistorySink for FileHistorySink {
    async fn save_history(&self, history: &RoomHistory) -> Result<()> {
        let mut line = serde_json::to_string(history)
            .map_err(|e| RankitError::StorageError(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::room::RoomStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn test_history_lines_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileHistorySink::new(dir.path().join("history.jsonl"));

        for code in ["AAAA", "BBBB"] {
            let record = RoomHistory {
                id: code.to_lowercase(),
                room_code: code.to_string(),
                teacher_id: "t1".to_string(),
                quiz_id: "quiz".to_string(),
                quiz_title: "Quiz".to_string(),
                status: RoomStatus::Finished,
                total_questions: 1,
                started_at: None,
                finished_at: Utc::now(),
                created_at: Utc::now(),
                players: Vec::new(),
                questions: Vec::new(),
            };
            sink.save_history(&record).await.unwrap();
        }

        let written = tokio::fs::read_to_string(sink.path()).await.unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: RoomHistory = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.room_code, "AAAA");
    }

    #[tokio::test]
    async fn test_load_quizzes_rejects_invalid_question() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizzes.json");
        tokio::fs::write(
            &path,
            r#"[{"id":"q","teacherId":"t","title":"T","status":"PUBLISHED",
                "questions":[{"id":"a","prompt":"P","options":["1","2","3","4"],"correctIndex":7}]}]"#,
        )
        .await
        .unwrap();

        assert!(load_quizzes(&path).await.is_err());
    }
}
