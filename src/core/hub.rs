//! Connection registry and fan-out
//!
//! The hub owns every live connection, groups them by room code and maps
//! session ids to connections. Its maps are touched only by one control loop
//! task; everything else talks to it through a cloneable [`HubHandle`].
//! Inbound business events are handed to an [`EventDispatcher`] on a freshly
//! spawned task so slow handlers never stall (un)registration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::core::connection::{Connection, ConnectionInfo, EnqueueError, OutboundMessage};
use crate::core::message_types::{ClientEvent, ServerEvent};
use crate::error::{RankitError, Result};

/// Business logic behind the hub
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    /// Handle one decoded client event
    async fn dispatch(&self, origin: ConnectionInfo, event: ClientEvent);

    /// Called once the last connection of a session goes away
    async fn connection_closed(&self, origin: ConnectionInfo);
}

/// Registry counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    pub connections: usize,
    pub rooms: usize,
    pub sessions: usize,
}

pub(crate) enum HubCommand {
    Register(Connection),
    Unregister {
        connection_id: String,
    },
    Inbound {
        connection_id: String,
        event: ClientEvent,
    },
    Broadcast {
        room_code: String,
        message: OutboundMessage,
    },
    SendToPlayer {
        player_id: String,
        message: OutboundMessage,
    },
    SendToConnection {
        connection_id: String,
        message: OutboundMessage,
    },
    Stats(oneshot::Sender<HubStats>),
}

/// Receiving end of the hub's command channel, consumed by [`Hub::new`]
pub struct HubInbox(mpsc::UnboundedReceiver<HubCommand>);

/// Serialize an event once so it can be shared by every recipient
pub fn encode_event(event: &ServerEvent) -> Option<OutboundMessage> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Arc::from(text)),
        Err(e) => {
            error!("Failed to serialize {} event: {}", event.name(), e);
            None
        }
    }
}

/// Cheap, cloneable front door to the hub's control loop
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    /// Create the command channel. The inbox goes to [`Hub::new`] once the
    /// dispatcher exists.
    pub fn channel() -> (Self, HubInbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { commands: tx }, HubInbox(rx))
    }

    fn send(&self, command: HubCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| RankitError::HubStopped)
    }

    pub fn register(&self, connection: Connection) -> Result<()> {
        self.send(HubCommand::Register(connection))
    }

    pub fn unregister(&self, connection_id: &str) -> Result<()> {
        self.send(HubCommand::Unregister {
            connection_id: connection_id.to_string(),
        })
    }

    /// Hand a decoded client event to the control loop
    pub fn inbound(&self, connection_id: &str, event: ClientEvent) -> Result<()> {
        self.send(HubCommand::Inbound {
            connection_id: connection_id.to_string(),
            event,
        })
    }

    /// Queue an event for every connection in a room
    pub fn broadcast_to_room(&self, room_code: &str, event: &ServerEvent) {
        let Some(message) = encode_event(event) else {
            return;
        };
        if self
            .send(HubCommand::Broadcast {
                room_code: room_code.to_string(),
                message,
            })
            .is_err()
        {
            warn!("Hub stopped, dropping {} broadcast", event.name());
        }
    }

    /// Queue an event for the connection currently bound to a session
    pub fn send_to_player(&self, player_id: &str, event: &ServerEvent) {
        let Some(message) = encode_event(event) else {
            return;
        };
        if self
            .send(HubCommand::SendToPlayer {
                player_id: player_id.to_string(),
                message,
            })
            .is_err()
        {
            warn!("Hub stopped, dropping {} for {}", event.name(), player_id);
        }
    }

    /// Queue an event for one specific connection
    pub fn send_to_connection(&self, connection_id: &str, event: &ServerEvent) {
        let Some(message) = encode_event(event) else {
            return;
        };
        if self
            .send(HubCommand::SendToConnection {
                connection_id: connection_id.to_string(),
                message,
            })
            .is_err()
        {
            warn!("Hub stopped, dropping {} for {}", event.name(), connection_id);
        }
    }

    /// Current registry counters, answered by the control loop
    pub async fn stats(&self) -> Result<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Stats(tx))?;
        rx.await.map_err(|_| RankitError::HubStopped)
    }
}

/// The control loop and the registry it exclusively owns
pub struct Hub {
    inbox: mpsc::UnboundedReceiver<HubCommand>,
    dispatcher: Arc<dyn EventDispatcher>,
    connections: HashMap<String, Connection>,
    rooms: HashMap<String, HashSet<String>>,
    sessions: HashMap<String, String>,
}

impl Hub {
    pub fn new(inbox: HubInbox, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            inbox: inbox.0,
            dispatcher,
            connections: HashMap::new(),
            rooms: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    /// Run the control loop on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands one at a time until every handle is dropped
    pub async fn run(mut self) {
        info!("Connection hub started");
        while let Some(command) = self.inbox.recv().await {
            self.handle(command);
        }
        info!("Connection hub stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(connection) => self.register(connection),
            HubCommand::Unregister { connection_id } => {
                self.remove(&connection_id, "client disconnected");
            }
            HubCommand::Inbound {
                connection_id,
                event,
            } => self.dispatch(&connection_id, event),
            HubCommand::Broadcast { room_code, message } => {
                let targets: Vec<String> = self
                    .rooms
                    .get(&room_code)
                    .map(|members| members.iter().cloned().collect())
                    .unwrap_or_default();
                debug!("Broadcast to {} connections in room {}", targets.len(), room_code);
                self.deliver(targets, message);
            }
            HubCommand::SendToPlayer { player_id, message } => {
                match self.sessions.get(&player_id).cloned() {
                    Some(connection_id) => self.deliver(vec![connection_id], message),
                    None => debug!("No live connection for player {}", player_id),
                }
            }
            HubCommand::SendToConnection {
                connection_id,
                message,
            } => self.deliver(vec![connection_id], message),
            HubCommand::Stats(reply) => {
                let _ = reply.send(HubStats {
                    connections: self.connections.len(),
                    rooms: self.rooms.len(),
                    sessions: self.sessions.len(),
                });
            }
        }
    }

    fn register(&mut self, connection: Connection) {
        let id = connection.id().to_string();
        let room_code = connection.room_code().to_string();
        let session_id = connection.session_id().to_string();

        self.rooms
            .entry(room_code.clone())
            .or_default()
            .insert(id.clone());
        if let Some(previous) = self.sessions.insert(session_id.clone(), id.clone()) {
            debug!(
                "Session {} moved from connection {} to {}",
                session_id, previous, id
            );
        }
        self.connections.insert(id.clone(), connection);

        info!(
            "Connection {} registered (room {}, session {}); {} live",
            id,
            room_code,
            session_id,
            self.connections.len()
        );
    }

    /// Drop a connection from every map. Dropping it closes its outbound
    /// queue, which stops the write pump.
    fn remove(&mut self, connection_id: &str, reason: &str) {
        let Some(connection) = self.connections.remove(connection_id) else {
            return;
        };

        if let Some(members) = self.rooms.get_mut(connection.room_code()) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(connection.room_code());
            }
        }

        // Only the session's current connection speaks for it
        let owned_session = self
            .sessions
            .get(connection.session_id())
            .is_some_and(|current| current == connection_id);
        if owned_session {
            self.sessions.remove(connection.session_id());
            let dispatcher = self.dispatcher.clone();
            let info = connection.info.clone();
            tokio::spawn(async move {
                dispatcher.connection_closed(info).await;
            });
        }

        info!(
            "Connection {} removed ({}) after {:?}; {} live",
            connection_id,
            reason,
            connection.connection_duration(),
            self.connections.len()
        );
    }

    fn dispatch(&mut self, connection_id: &str, event: ClientEvent) {
        let Some(connection) = self.connections.get(connection_id) else {
            debug!(
                "Ignoring {} from unregistered connection {}",
                event.name(),
                connection_id
            );
            return;
        };

        let origin = connection.info.clone();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(origin, event).await;
        });
    }

    /// Non-blocking enqueue; a full or closed queue gets the connection
    /// torn down instead of stalling the loop
    fn deliver(&mut self, targets: Vec<String>, message: OutboundMessage) {
        let mut dead = Vec::new();
        for id in targets {
            let Some(connection) = self.connections.get(&id) else {
                continue;
            };
            match connection.try_enqueue(message.clone()) {
                Ok(()) => {}
                Err(EnqueueError::Full) => {
                    warn!("Outbound queue full for connection {}, dropping it", id);
                    dead.push((id, "outbound queue full"));
                }
                Err(EnqueueError::Closed) => dead.push((id, "write side closed")),
            }
        }

        for (id, reason) in dead {
            self.remove(&id, reason);
        }
    }
}
