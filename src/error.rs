use thiserror::Error;

use crate::core::room::RoomStatus;

/// Broad failure categories, used to decide how a failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    StateConflict,
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum RankitError {
    // Lookup errors
    #[error("Room not found: {0}")]
    RoomNotFound(String),
    #[error("Quiz not found: {0}")]
    QuizNotFound(String),
    #[error("Player not found in room: {0}")]
    PlayerNotFound(String),
    #[error("Player is not waiting for approval: {0}")]
    PendingPlayerNotFound(String),

    // Authorization errors
    #[error("Only the room's teacher can perform this action")]
    NotRoomTeacher,
    #[error("Quiz does not belong to this teacher")]
    QuizNotOwned,

    // State conflicts
    #[error("Only published quizzes can be played")]
    QuizNotPublished,
    #[error("The room has already started")]
    RoomAlreadyStarted,
    #[error("The question is not open for answers")]
    QuestionNotOpen,
    #[error("The game has already finished")]
    GameFinished,
    #[error("Cannot {action} while the room is {status}")]
    InvalidTransition {
        action: &'static str,
        status: RoomStatus,
    },
    #[error("Nickname already in use: {0}")]
    NicknameTaken(String),

    // Validation errors
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Message parse error: {0}")]
    MessageParseError(String),

    // Connection errors
    #[error("Connection hub is not running")]
    HubStopped,

    // Collaborator errors
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Archive queue error: {0}")]
    ArchiveError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RankitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_)
            | Self::QuizNotFound(_)
            | Self::PlayerNotFound(_)
            | Self::PendingPlayerNotFound(_) => ErrorKind::NotFound,
            Self::NotRoomTeacher | Self::QuizNotOwned => ErrorKind::Authorization,
            Self::QuizNotPublished
            | Self::RoomAlreadyStarted
            | Self::QuestionNotOpen
            | Self::GameFinished
            | Self::InvalidTransition { .. }
            | Self::NicknameTaken(_) => ErrorKind::StateConflict,
            Self::ValidationError(_) | Self::MessageParseError(_) => ErrorKind::Validation,
            Self::HubStopped
            | Self::StorageError(_)
            | Self::ArchiveError(_)
            | Self::ConfigError(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for RankitError {
    fn from(err: serde_json::Error) -> Self {
        RankitError::MessageParseError(err.to_string())
    }
}

impl From<std::io::Error> for RankitError {
    fn from(err: std::io::Error) -> Self {
        RankitError::StorageError(err.to_string())
    }
}

// Generic result type for the engine
pub type Result<T> = std::result::Result<T, RankitError>;
