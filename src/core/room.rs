use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::constants::{
    CORRECT_ANSWER_POINTS, MAX_NICKNAME_LENGTH, OPTIONS_PER_QUESTION, ROOM_CODE_ALPHABET,
};
use crate::core::quiz::{Question, Quiz};
use crate::error::{RankitError, Result};

/// Lifecycle of a live room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Waiting for players, no question shown yet
    Lobby,
    /// A question is accepting answers
    Open,
    /// The current question has been scored and its answer shown
    Revealed,
    /// All questions played; terminal
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "LOBBY",
            Self::Open => "OPEN",
            Self::Revealed => "REVEALED",
            Self::Finished => "FINISHED",
        };
        f.write_str(name)
    }
}

/// A student in a room. The id is the connection's session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub nickname: String,
    pub score: u32,
    pub connected: bool,
    /// Position in the join sequence, used as leaderboard tie-break
    #[serde(skip)]
    pub join_order: u64,
}

/// A player's answer to the current question
#[derive(Debug, Clone)]
pub struct Answer {
    pub player_id: String,
    pub answer_index: u8,
    pub submitted_at: DateTime<Utc>,
}

/// Question as shown to clients; the correct index is withheld while answering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    pub options: [String; OPTIONS_PER_QUESTION],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<u8>,
}

/// Read-only projection of a room sent to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateSnapshot {
    pub status: RoomStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionView>,
    pub total_questions: usize,
    /// -1 until the first question opens
    pub current_question_index: i64,
    pub players_count: usize,
    pub answers_count: usize,
    /// Only present while REVEALED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<u8>,
}

/// Answer distribution recorded when a question is revealed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_index: usize,
    pub question_id: String,
    pub prompt: String,
    pub correct_index: u8,
    pub option_counts: [usize; OPTIONS_PER_QUESTION],
    pub correct_count: usize,
}

/// Result of a join request
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// New player queued for teacher approval
    Pending(Player),
    /// Session already approved; flagged connected again
    Reconnected(Player),
}

/// State produced by a successful reveal, read under the same lock
#[derive(Debug, Clone)]
pub struct RevealOutcome {
    pub snapshot: RoomStateSnapshot,
    pub leaderboard: Vec<Player>,
    pub result: QuestionResult,
}

/// Everything needed to archive a room once it is over
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub status: RoomStatus,
    pub players: Vec<Player>,
    pub results: Vec<QuestionResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct RoomState {
    status: RoomStatus,
    current_question_index: Option<usize>,
    pending_players: HashMap<String, Player>,
    players: HashMap<String, Player>,
    /// Answers for the current question only
    answers: HashMap<String, Answer>,
    results: Vec<QuestionResult>,
    next_join_order: u64,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl RoomState {
    fn new() -> Self {
        Self {
            status: RoomStatus::Lobby,
            current_question_index: None,
            pending_players: HashMap::new(),
            players: HashMap::new(),
            answers: HashMap::new(),
            results: Vec::new(),
            next_join_order: 0,
            started_at: None,
            finished_at: None,
        }
    }

    fn nickname_in_use(&self, nickname: &str) -> bool {
        self.players
            .values()
            .chain(self.pending_players.values())
            .any(|p| p.nickname.eq_ignore_ascii_case(nickname))
    }
}

/// Trim a nickname and reject values that cannot be shown on a leaderboard
pub fn validate_nickname(nickname: &str) -> Result<String> {
    let trimmed = nickname.trim();
    if trimmed.is_empty() {
        return Err(RankitError::ValidationError(
            "Nickname cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_NICKNAME_LENGTH {
        return Err(RankitError::ValidationError(format!(
            "Nickname too long. Maximum {} characters allowed",
            MAX_NICKNAME_LENGTH
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(RankitError::ValidationError(
            "Nickname contains control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// One live quiz session.
///
/// All state sits behind a single lock: transitions take it exclusively,
/// snapshots share it. Nothing outside this type touches the maps.
#[derive(Debug)]
pub struct Room {
    code: String,
    teacher_id: String,
    quiz: Arc<Quiz>,
    created_at: DateTime<Utc>,
    state: RwLock<RoomState>,
}

impl Room {
    pub fn new(code: String, teacher_id: String, quiz: Arc<Quiz>) -> Self {
        Self {
            code,
            teacher_id,
            quiz,
            created_at: Utc::now(),
            state: RwLock::new(RoomState::new()),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn teacher_id(&self) -> &str {
        &self.teacher_id
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_owned_by(&self, teacher_id: &str) -> bool {
        self.teacher_id == teacher_id
    }

    pub async fn status(&self) -> RoomStatus {
        self.state.read().await.status
    }

    /// Ask to join. New players wait in the pending queue until the teacher
    /// approves them; an already approved session is treated as a reconnect.
    pub async fn join_request(&self, session_id: &str, nickname: &str) -> Result<JoinOutcome> {
        let mut state = self.state.write().await;

        if let Some(player) = state.players.get_mut(session_id) {
            player.connected = true;
            return Ok(JoinOutcome::Reconnected(player.clone()));
        }

        if state.status != RoomStatus::Lobby {
            return Err(RankitError::RoomAlreadyStarted);
        }

        if let Some(pending) = state.pending_players.get(session_id) {
            return Ok(JoinOutcome::Pending(pending.clone()));
        }

        let nickname = validate_nickname(nickname)?;
        if state.nickname_in_use(&nickname) {
            return Err(RankitError::NicknameTaken(nickname));
        }

        let player = Player {
            id: session_id.to_string(),
            nickname,
            score: 0,
            connected: true,
            join_order: state.next_join_order,
        };
        state.next_join_order += 1;
        state
            .pending_players
            .insert(session_id.to_string(), player.clone());
        Ok(JoinOutcome::Pending(player))
    }

    /// Move a pending session into the active roster
    pub async fn approve_player(&self, session_id: &str) -> Result<Player> {
        let mut state = self.state.write().await;

        match state.pending_players.remove(session_id) {
            Some(player) => {
                state.players.insert(session_id.to_string(), player.clone());
                Ok(player)
            }
            None => state
                .players
                .get(session_id)
                .cloned()
                .ok_or_else(|| RankitError::PendingPlayerNotFound(session_id.to_string())),
        }
    }

    /// Discard a pending session
    pub async fn reject_player(&self, session_id: &str) -> Result<Player> {
        let mut state = self.state.write().await;
        state
            .pending_players
            .remove(session_id)
            .ok_or_else(|| RankitError::PendingPlayerNotFound(session_id.to_string()))
    }

    /// Remove an active player along with any answer in flight
    pub async fn kick_player(&self, player_id: &str) -> Result<Player> {
        let mut state = self.state.write().await;
        let player = state
            .players
            .remove(player_id)
            .ok_or_else(|| RankitError::PlayerNotFound(player_id.to_string()))?;
        state.answers.remove(player_id);
        Ok(player)
    }

    /// Record that a session lost its connection.
    ///
    /// Active players keep their seat and score; pending requests are dropped
    /// so the nickname becomes available again. Returns true when an active
    /// player changed.
    pub async fn mark_disconnected(&self, session_id: &str) -> bool {
        let mut state = self.state.write().await;
        if state.pending_players.remove(session_id).is_some() {
            return false;
        }
        match state.players.get_mut(session_id) {
            Some(player) if player.connected => {
                player.connected = false;
                true
            }
            _ => false,
        }
    }

    /// Open the next question, or finish the game when none are left
    pub async fn next_question(&self) -> Result<RoomStateSnapshot> {
        let mut state = self.state.write().await;

        match state.status {
            RoomStatus::Lobby | RoomStatus::Revealed => {}
            RoomStatus::Finished => return Err(RankitError::GameFinished),
            status @ RoomStatus::Open => {
                return Err(RankitError::InvalidTransition {
                    action: "open the next question",
                    status,
                })
            }
        }

        let next_index = state.current_question_index.map_or(0, |i| i + 1);
        if next_index >= self.quiz.question_count() {
            state.status = RoomStatus::Finished;
            state.finished_at = Some(Utc::now());
            state.answers.clear();
        } else {
            state.current_question_index = Some(next_index);
            state.status = RoomStatus::Open;
            state.answers = HashMap::new();
            state.started_at.get_or_insert_with(Utc::now);
        }

        Ok(self.build_snapshot(&state))
    }

    /// Score the open question and expose its answer.
    ///
    /// Points are awarded exactly once: a second call finds the room
    /// REVEALED and fails without touching scores.
    pub async fn reveal(&self) -> Result<RevealOutcome> {
        let mut state = self.state.write().await;

        match state.status {
            RoomStatus::Open => {}
            RoomStatus::Finished => return Err(RankitError::GameFinished),
            status => {
                return Err(RankitError::InvalidTransition {
                    action: "reveal",
                    status,
                })
            }
        }

        let index = state
            .current_question_index
            .ok_or(RankitError::InvalidTransition {
                action: "reveal",
                status: RoomStatus::Lobby,
            })?;
        let question = &self.quiz.questions[index];

        let mut option_counts = [0usize; OPTIONS_PER_QUESTION];
        let mut correct_ids = Vec::new();
        for answer in state.answers.values() {
            if let Some(count) = option_counts.get_mut(usize::from(answer.answer_index)) {
                *count += 1;
            }
            if answer.answer_index == question.correct_index {
                correct_ids.push(answer.player_id.clone());
            }
        }

        for player_id in &correct_ids {
            if let Some(player) = state.players.get_mut(player_id) {
                player.score += CORRECT_ANSWER_POINTS;
            }
        }

        let result = QuestionResult {
            question_index: index,
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            correct_index: question.correct_index,
            option_counts,
            correct_count: correct_ids.len(),
        };
        state.results.push(result.clone());
        state.status = RoomStatus::Revealed;

        Ok(RevealOutcome {
            snapshot: self.build_snapshot(&state),
            leaderboard: state.players.values().cloned().collect(),
            result,
        })
    }

    /// Record (or overwrite) a player's answer; returns how many players
    /// have answered the current question
    pub async fn submit_answer(&self, player_id: &str, answer_index: u8) -> Result<usize> {
        if usize::from(answer_index) >= OPTIONS_PER_QUESTION {
            return Err(RankitError::ValidationError(format!(
                "Answer index must be between 0 and {}",
                OPTIONS_PER_QUESTION - 1
            )));
        }

        let mut state = self.state.write().await;
        if state.status != RoomStatus::Open {
            return Err(RankitError::QuestionNotOpen);
        }
        if !state.players.contains_key(player_id) {
            return Err(RankitError::PlayerNotFound(player_id.to_string()));
        }

        state.answers.insert(
            player_id.to_string(),
            Answer {
                player_id: player_id.to_string(),
                answer_index,
                submitted_at: Utc::now(),
            },
        );
        Ok(state.answers.len())
    }

    pub async fn snapshot(&self) -> RoomStateSnapshot {
        let state = self.state.read().await;
        self.build_snapshot(&state)
    }

    /// Active players in no particular order
    pub async fn leaderboard(&self) -> Vec<Player> {
        self.state.read().await.players.values().cloned().collect()
    }

    pub async fn pending_players(&self) -> Vec<Player> {
        self.state
            .read()
            .await
            .pending_players
            .values()
            .cloned()
            .collect()
    }

    pub async fn player(&self, player_id: &str) -> Option<Player> {
        self.state.read().await.players.get(player_id).cloned()
    }

    pub async fn summary(&self) -> RoomSummary {
        let state = self.state.read().await;
        RoomSummary {
            status: state.status,
            players: state.players.values().cloned().collect(),
            results: state.results.clone(),
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }

    fn build_snapshot(&self, state: &RoomState) -> RoomStateSnapshot {
        let current = state
            .current_question_index
            .and_then(|i| self.quiz.questions.get(i));
        let show_answer = state.status != RoomStatus::Open;

        RoomStateSnapshot {
            status: state.status,
            current_question: current.map(|q| question_view(q, show_answer)),
            total_questions: self.quiz.question_count(),
            current_question_index: state.current_question_index.map_or(-1, |i| i as i64),
            players_count: state.players.len(),
            answers_count: state.answers.len(),
            correct_index: match (state.status, current) {
                (RoomStatus::Revealed, Some(q)) => Some(q.correct_index),
                _ => None,
            },
        }
    }
}

fn question_view(question: &Question, show_answer: bool) -> QuestionView {
    QuestionView {
        id: question.id.clone(),
        prompt: question.prompt.clone(),
        options: question.options.clone(),
        correct_index: show_answer.then_some(question.correct_index),
    }
}

/// Generate a random room code from the unambiguous alphabet
pub fn generate_room_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Registry of live rooms, keyed by room code
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    code_length: usize,
}

impl RoomManager {
    pub fn new(code_length: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            code_length,
        }
    }

    /// Create a room with a fresh, unused code
    pub async fn create_room(&self, teacher_id: String, quiz: Arc<Quiz>) -> Arc<Room> {
        let mut rooms = self.rooms.write().await;

        let code = loop {
            let candidate = generate_room_code(self.code_length);
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let room = Arc::new(Room::new(code.clone(), teacher_id, quiz));
        rooms.insert(code, room.clone());
        room
    }

    /// Look up a room; codes are matched case-insensitively
    pub async fn get_room(&self, code: &str) -> Result<Arc<Room>> {
        let key = code.trim().to_ascii_uppercase();
        self.rooms
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or(RankitError::RoomNotFound(key))
    }

    pub async fn remove_room(&self, code: &str) -> Option<Arc<Room>> {
        let key = code.trim().to_ascii_uppercase();
        self.rooms.write().await.remove(&key)
    }

    pub async fn contains(&self, code: &str) -> bool {
        let key = code.trim().to_ascii_uppercase();
        self.rooms.read().await.contains_key(&key)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
