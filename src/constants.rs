// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const WS_PATH: &str = "ws";
pub const ROOMS_PATH: &str = "rooms";

// Connection limits
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

// Room settings
pub const DEFAULT_ROOM_CODE_LENGTH: usize = 6;
pub const MIN_ROOM_CODE_LENGTH: usize = 4;
pub const MAX_ROOM_CODE_LENGTH: usize = 12;
/// Unambiguous characters only (no 0/O, 1/I/L)
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const MAX_NICKNAME_LENGTH: usize = 32;

// Scoring
pub const CORRECT_ANSWER_POINTS: u32 = 10;
pub const OPTIONS_PER_QUESTION: usize = 4;

// Archiving
pub const DEFAULT_ARCHIVE_QUEUE: usize = 64;
pub const DEFAULT_ARCHIVE_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_ARCHIVE_RETRY_MS: u64 = 500;
