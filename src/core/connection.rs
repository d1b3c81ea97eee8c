//! Per-connection registry entry
//! Ties a client's bounded outbound queue to its room and session

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

/// Serialized event text shared between every queue it is pushed to
pub type OutboundMessage = Arc<str>;

/// Why a non-blocking enqueue did not go through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The client is not draining its queue fast enough
    Full,
    /// The write pump is gone
    Closed,
}

/// Identity of a connection, handed to business logic with every event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub room_code: String,
    pub session_id: String,
}

/// Represents one live client connection as seen by the hub
pub struct Connection {
    pub info: ConnectionInfo,
    sender: mpsc::Sender<OutboundMessage>,
    pub connected_at: Instant,
}

impl Connection {
    /// Create a connection with a fresh connection id
    pub fn new(
        room_code: String,
        session_id: String,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        Self {
            info: ConnectionInfo {
                connection_id: Uuid::new_v4().to_string(),
                room_code,
                session_id,
            },
            sender,
            connected_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.info.connection_id
    }

    pub fn room_code(&self) -> &str {
        &self.info.room_code
    }

    pub fn session_id(&self) -> &str {
        &self.info.session_id
    }

    /// Queue a message without waiting
    pub fn try_enqueue(&self, message: OutboundMessage) -> Result<(), EnqueueError> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
