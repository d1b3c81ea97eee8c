//! Server configuration module
//! Handles runtime parameters for the quiz session server

use crate::constants::{
    DEFAULT_ARCHIVE_MAX_ATTEMPTS, DEFAULT_ARCHIVE_QUEUE, DEFAULT_ARCHIVE_RETRY_MS, DEFAULT_HOST,
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_OUTBOUND_QUEUE, DEFAULT_PORT, DEFAULT_ROOM_CODE_LENGTH,
    MAX_ROOM_CODE_LENGTH, MIN_ROOM_CODE_LENGTH,
};
use crate::error::{RankitError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of each connection's outbound queue
    pub outbound_queue: usize,
    /// Largest inbound WebSocket frame accepted
    pub max_message_size: usize,
    pub room_code_length: usize,
    /// Capacity of the archive hand-off queue
    pub archive_queue: usize,
    pub archive_max_attempts: u32,
    /// Base delay between archive attempts, multiplied by the attempt number
    pub archive_retry_delay: Duration,
    /// JSON file with the quizzes served by this process
    pub quiz_file: Option<String>,
    /// JSON-lines file the archiver appends finished rooms to
    pub history_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            room_code_length: DEFAULT_ROOM_CODE_LENGTH,
            archive_queue: DEFAULT_ARCHIVE_QUEUE,
            archive_max_attempts: DEFAULT_ARCHIVE_MAX_ATTEMPTS,
            archive_retry_delay: Duration::from_millis(DEFAULT_ARCHIVE_RETRY_MS),
            quiz_file: None,
            history_file: None,
        }
    }
}

/// Parse an optional numeric variable, failing loudly on garbage
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            RankitError::ConfigError(format!("{} must be a number, got '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("RANKIT_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = parse_var("RANKIT_PORT", DEFAULT_PORT)?;
        let outbound_queue = parse_var("RANKIT_OUTBOUND_QUEUE", DEFAULT_OUTBOUND_QUEUE)?;
        let max_message_size = parse_var("RANKIT_MAX_MESSAGE_SIZE", DEFAULT_MAX_MESSAGE_SIZE)?;
        let room_code_length = parse_var("RANKIT_ROOM_CODE_LENGTH", DEFAULT_ROOM_CODE_LENGTH)?;
        let archive_queue = parse_var("RANKIT_ARCHIVE_QUEUE", DEFAULT_ARCHIVE_QUEUE)?;
        let archive_max_attempts =
            parse_var("RANKIT_ARCHIVE_MAX_ATTEMPTS", DEFAULT_ARCHIVE_MAX_ATTEMPTS)?;
        let retry_ms = parse_var("RANKIT_ARCHIVE_RETRY_MS", DEFAULT_ARCHIVE_RETRY_MS)?;

        let quiz_file = env::var("RANKIT_QUIZ_FILE").ok().filter(|p| !p.is_empty());
        let history_file = env::var("RANKIT_HISTORY_FILE").ok().filter(|p| !p.is_empty());

        if let Some(ref path) = quiz_file {
            if !std::path::Path::new(path).exists() {
                return Err(RankitError::ConfigError(format!(
                    "Quiz file does not exist: {}",
                    path
                )));
            }
        }

        let config = Self {
            host,
            port,
            outbound_queue,
            max_message_size,
            room_code_length,
            archive_queue,
            archive_max_attempts,
            archive_retry_delay: Duration::from_millis(retry_ms),
            quiz_file,
            history_file,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that limits are usable
    pub fn validate(&self) -> Result<()> {
        if self.outbound_queue == 0 {
            return Err(RankitError::ConfigError(
                "RANKIT_OUTBOUND_QUEUE must be greater than zero".to_string(),
            ));
        }
        if self.archive_queue == 0 {
            return Err(RankitError::ConfigError(
                "RANKIT_ARCHIVE_QUEUE must be greater than zero".to_string(),
            ));
        }
        if self.archive_max_attempts == 0 {
            return Err(RankitError::ConfigError(
                "RANKIT_ARCHIVE_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if !(MIN_ROOM_CODE_LENGTH..=MAX_ROOM_CODE_LENGTH).contains(&self.room_code_length) {
            return Err(RankitError::ConfigError(format!(
                "RANKIT_ROOM_CODE_LENGTH must be between {} and {}",
                MIN_ROOM_CODE_LENGTH, MAX_ROOM_CODE_LENGTH
            )));
        }
        Ok(())
    }
}
