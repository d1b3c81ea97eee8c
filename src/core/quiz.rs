//! Quiz snapshot consumed by live rooms
//!
//! Quizzes are authored and published elsewhere; the engine only reads the
//! finished question list. A room holds the quiz behind an `Arc` so the
//! snapshot stays immutable for the session's lifetime.

use serde::{Deserialize, Serialize};

use crate::constants::OPTIONS_PER_QUESTION;
use crate::error::{RankitError, Result};

/// Publication state of a quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizStatus {
    Draft,
    Published,
}

/// A multiple-choice question with exactly four options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: [String; OPTIONS_PER_QUESTION],
    /// Index of the correct option, 0..=3
    pub correct_index: u8,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        options: [&str; OPTIONS_PER_QUESTION],
        correct_index: u8,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            options: options.map(str::to_string),
            correct_index,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(RankitError::ValidationError(format!(
                "Question {} has an empty prompt",
                self.id
            )));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(RankitError::ValidationError(format!(
                "Question {} has an empty option",
                self.id
            )));
        }
        if usize::from(self.correct_index) >= OPTIONS_PER_QUESTION {
            return Err(RankitError::ValidationError(format!(
                "Question {} has correct index {} (expected 0..=3)",
                self.id, self.correct_index
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub teacher_id: String,
    pub title: String,
    pub status: QuizStatus,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn is_published(&self) -> bool {
        self.status == QuizStatus::Published
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Check every question, used when loading quizzes from outside
    pub fn validate(&self) -> Result<()> {
        self.questions.iter().try_for_each(Question::validate)
    }
}
