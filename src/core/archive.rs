//! Hand-off of finished rooms to history storage
//!
//! The orchestrator pushes a record onto a bounded queue and moves on; a
//! dedicated archiver task drains it, retrying failed saves with a linear
//! backoff. Once a record is stored the room is evicted from the registry.
//! Failures are logged and counted, never reported to players.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::constants::CORRECT_ANSWER_POINTS;
use crate::core::game::rank_players;
use crate::core::room::{Room, RoomManager};
use crate::error::{RankitError, Result};
use crate::storage::traits::{HistorySink, PlayerStats, RoomHistory};

#[derive(Debug, Default)]
struct ArchiveCounters {
    archived: AtomicUsize,
    failed: AtomicUsize,
}

/// Snapshot of archiver outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveStats {
    pub archived: usize,
    pub failed: usize,
}

/// Build the history record for a room from its final leaderboard
pub async fn build_history(room: &Room) -> RoomHistory {
    let summary = room.summary().await;
    let players = rank_players(summary.players)
        .into_iter()
        .enumerate()
        .map(|(i, p)| PlayerStats {
            correct_count: p.score / CORRECT_ANSWER_POINTS,
            player_id: p.id,
            nickname: p.nickname,
            score: p.score,
            rank: i + 1,
        })
        .collect();

    let now = Utc::now();
    RoomHistory {
        id: Uuid::new_v4().to_string(),
        room_code: room.code().to_string(),
        teacher_id: room.teacher_id().to_string(),
        quiz_id: room.quiz().id.clone(),
        quiz_title: room.quiz().title.clone(),
        status: summary.status,
        total_questions: room.quiz().question_count(),
        started_at: summary.started_at,
        finished_at: summary.finished_at.unwrap_or(now),
        created_at: now,
        players,
        questions: summary.results,
    }
}

/// Producer side of the archive queue
#[derive(Clone)]
pub struct ArchiverHandle {
    sender: mpsc::Sender<RoomHistory>,
    counters: Arc<ArchiveCounters>,
}

impl ArchiverHandle {
    /// Queue a record without waiting
    pub fn submit(&self, record: RoomHistory) -> Result<()> {
        self.sender.try_send(record).map_err(|e| match e {
            mpsc::error::TrySendError::Full(r) => RankitError::ArchiveError(format!(
                "archive queue full, room {} not archived",
                r.room_code
            )),
            mpsc::error::TrySendError::Closed(r) => RankitError::ArchiveError(format!(
                "archiver stopped, room {} not archived",
                r.room_code
            )),
        })
    }

    pub fn stats(&self) -> ArchiveStats {
        ArchiveStats {
            archived: self.counters.archived.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// Consumer side: saves records through the history sink
pub struct Archiver {
    receiver: mpsc::Receiver<RoomHistory>,
    sink: Arc<dyn HistorySink>,
    rooms: Arc<RoomManager>,
    max_attempts: u32,
    retry_delay: Duration,
    counters: Arc<ArchiveCounters>,
}

impl Archiver {
    pub fn new(
        config: &ServerConfig,
        sink: Arc<dyn HistorySink>,
        rooms: Arc<RoomManager>,
    ) -> (Self, ArchiverHandle) {
        let (sender, receiver) = mpsc::channel(config.archive_queue);
        let counters = Arc::new(ArchiveCounters::default());
        let archiver = Self {
            receiver,
            sink,
            rooms,
            max_attempts: config.archive_max_attempts.max(1),
            retry_delay: config.archive_retry_delay,
            counters: counters.clone(),
        };
        (archiver, ArchiverHandle { sender, counters })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        while let Some(record) = self.receiver.recv().await {
            if self.archive(&record).await {
                self.rooms.remove_room(&record.room_code).await;
                self.counters.archived.fetch_add(1, Ordering::Relaxed);
            } else {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        info!("Archiver stopped");
    }

    async fn archive(&self, record: &RoomHistory) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.sink.save_history(record).await {
                Ok(()) => {
                    info!(
                        "Room {} archived as {} ({} players)",
                        record.room_code,
                        record.id,
                        record.players.len()
                    );
                    return true;
                }
                Err(e) => {
                    warn!(
                        "Archive attempt {}/{} for room {} failed: {}",
                        attempt, self.max_attempts, record.room_code, e
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        error!(
            "Giving up archiving room {} after {} attempts",
            record.room_code, self.max_attempts
        );
        false
    }
}
