//! Core of the quiz engine: rooms, connections, the hub and game flow

pub mod archive;
pub mod connection;
pub mod game;
pub mod hub;
pub mod message_types;
pub mod quiz;
pub mod room;
pub mod server;

// Re-export main components for convenience
pub use archive::{ArchiveStats, Archiver, ArchiverHandle};
pub use connection::{Connection, ConnectionInfo, OutboundMessage};
pub use game::{rank_players, GameService};
pub use hub::{EventDispatcher, Hub, HubHandle, HubStats};
pub use message_types::{ClientEvent, ModerationAction, ServerEvent};
pub use quiz::{Question, Quiz, QuizStatus};
pub use room::{Player, Room, RoomManager, RoomStateSnapshot, RoomStatus};
pub use server::{ServerManager, SharedServerManager};
