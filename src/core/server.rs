//! Process-wide wiring of the room registry, hub, game service and archiver

use std::sync::Arc;

use log::info;

use crate::config::ServerConfig;
use crate::core::archive::{Archiver, ArchiverHandle};
use crate::core::game::GameService;
use crate::core::hub::{Hub, HubHandle};
use crate::core::room::RoomManager;
use crate::storage::traits::{HistorySink, QuizRepository};

/// Owns the long-lived services shared by every request handler
pub struct ServerManager {
    config: ServerConfig,
    rooms: Arc<RoomManager>,
    hub: HubHandle,
    game: Arc<GameService>,
    archiver: ArchiverHandle,
}

pub type SharedServerManager = Arc<ServerManager>;

impl ServerManager {
    /// Build every service and spawn the hub and archiver tasks.
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: ServerConfig,
        quizzes: Arc<dyn QuizRepository>,
        history: Arc<dyn HistorySink>,
    ) -> Self {
        let rooms = Arc::new(RoomManager::new(config.room_code_length));

        let (archiver, archiver_handle) = Archiver::new(&config, history, rooms.clone());
        archiver.spawn();

        // The hub needs the dispatcher and the dispatcher needs a hub handle;
        // the channel exists first so neither side is ever half-built.
        let (hub, inbox) = HubHandle::channel();
        let game = Arc::new(GameService::new(
            rooms.clone(),
            quizzes,
            hub.clone(),
            archiver_handle.clone(),
        ));
        Hub::new(inbox, game.clone()).spawn();

        info!(
            "Quiz engine ready (outbound queue {}, archive queue {}, room codes of {} chars)",
            config.outbound_queue, config.archive_queue, config.room_code_length
        );

        Self {
            config,
            rooms,
            hub,
            game,
            archiver: archiver_handle,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn rooms(&self) -> &Arc<RoomManager> {
        &self.rooms
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    pub fn game(&self) -> &Arc<GameService> {
        &self.game
    }

    pub fn archiver(&self) -> &ArchiverHandle {
        &self.archiver
    }
}
