//! Rankit Live - real-time classroom quiz engine
//!
//! A teacher opens a room for a published quiz, students join through a
//! short room code over WebSocket, and the server drives questions,
//! answers, reveals and the live leaderboard. Finished rooms are archived
//! to a pluggable history sink.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use error::{RankitError, Result};
