//! Quiz lookup and history archiving backends

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{load_quizzes, FileHistorySink};
pub use memory::{MemoryHistoryStore, MemoryQuizStore};
pub use traits::{HistorySink, PlayerStats, QuizRepository, RoomHistory};
