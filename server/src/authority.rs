//! Authority-side connection handling and message dispatch.
//!
//! The authority owns the live connection slots and the canonical
//! [`PlayerRegistry`]. Each call to [`Authority::update`] runs one cycle in a
//! fixed order:
//!
//! 1. sweep: slots that died last cycle are swap-removed,
//! 2. accept: new connections get a slot and a `PLAYER_INIT`,
//! 3. read: every live slot's pending events are drained and dispatched,
//! 4. broadcast: if the interval has elapsed, `SERVER_UPDATE` goes to every
//!    live slot.
//!
//! Slot indices move during the sweep, so every protocol decision is keyed by
//! the player id assigned at accept time, never by index.

use log::{debug, error, info, warn};
use shared::{
    decode, encode, ConnectionId, Envelope, ServerTransport, Ticker, TransportEvent,
};
use std::time::{Duration, Instant};

use crate::registry::{PlayerRegistry, Registration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Accepted and sent its id; no registry entry yet.
    Connected,
    /// Has a registry entry.
    Handshaken,
    /// Terminal. Removed by the next sweep.
    Disconnected,
}

#[derive(Debug)]
struct Slot {
    connection: ConnectionId,
    player_id: String,
    state: SlotState,
}

impl Slot {
    fn is_live(&self) -> bool {
        self.state != SlotState::Disconnected
    }
}

pub struct Authority<T: ServerTransport> {
    transport: T,
    slots: Vec<Slot>,
    registry: PlayerRegistry,
    broadcast: Ticker,
    stopped: bool,
}

impl<T: ServerTransport> Authority<T> {
    pub fn new(transport: T, broadcast_interval: Duration) -> Self {
        Self {
            transport,
            slots: Vec::new(),
            registry: PlayerRegistry::new(),
            broadcast: Ticker::new(broadcast_interval),
            stopped: false,
        }
    }

    /// Runs one cycle. The first cycle also starts the broadcast timer.
    pub fn update(&mut self, now: Instant) {
        if self.stopped {
            return;
        }
        if !self.broadcast.is_running() {
            self.broadcast.start(now);
        }

        self.transport.update(now);
        self.sweep();
        self.accept_connections();
        self.read_messages();

        if self.broadcast.poll(now) {
            self.broadcast_server_update();
        }
    }

    /// Closes every live connection and stops broadcasting for good.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.broadcast.cancel();

        for slot in self.slots.iter_mut().filter(|slot| slot.is_live()) {
            self.transport.disconnect(slot.connection);
            slot.state = SlotState::Disconnected;
        }
        self.slots.clear();
        info!("Authority stopped");
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of slots that are not yet disconnected.
    pub fn connection_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_live()).count()
    }

    /// Lifecycle state of a connection, or `None` once its slot is swept.
    pub fn slot_state(&self, connection: ConnectionId) -> Option<SlotState> {
        self.slots
            .iter()
            .find(|slot| slot.connection == connection)
            .map(|slot| slot.state)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn sweep(&mut self) {
        let mut index = 0;
        while index < self.slots.len() {
            if self.slots[index].is_live() {
                index += 1;
            } else {
                self.slots.swap_remove(index);
            }
        }
    }

    fn accept_connections(&mut self) {
        while let Some(connection) = self.transport.accept() {
            let player_id = connection.to_string();
            info!("Accepted connection {} as player {}", connection, player_id);

            self.slots.push(Slot {
                connection,
                player_id: player_id.clone(),
                state: SlotState::Connected,
            });
            self.send(connection, &Envelope::PlayerInit { your_id: player_id });
        }
    }

    fn read_messages(&mut self) {
        for index in 0..self.slots.len() {
            while self.slots[index].is_live() {
                let Some(event) = self.transport.pop_event(self.slots[index].connection) else {
                    break;
                };
                match event {
                    TransportEvent::Data(bytes) => self.handle_data(index, &bytes),
                    TransportEvent::Disconnected => self.handle_disconnect(index),
                    TransportEvent::Connected => {
                        warn!(
                            "Ignoring connect event on accepted connection {}",
                            self.slots[index].connection
                        );
                    }
                }
            }
        }
    }

    fn handle_data(&mut self, index: usize, bytes: &[u8]) {
        let connection = self.slots[index].connection;
        let envelope = match decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Discarding message from connection {}: {}", connection, e);
                return;
            }
        };

        match envelope {
            Envelope::Handshake { mut player } => {
                let slot = &mut self.slots[index];
                if player.id != slot.player_id {
                    warn!(
                        "Handshake on connection {} claims id {:?}, using {}",
                        connection, player.id, slot.player_id
                    );
                    player.id = slot.player_id.clone();
                }

                if self.registry.register(player) == Registration::Replaced {
                    warn!("Duplicate handshake from player {}", slot.player_id);
                }
                slot.state = SlotState::Handshaken;
                debug!("Handshake received from player {}", slot.player_id);
            }
            Envelope::PlayerUpdate { player } => {
                if self.registry.update_position(&player.id, player.position) {
                    debug!(
                        "Player {} position: ({}, {}, {})",
                        player.id, player.position.x, player.position.y, player.position.z
                    );
                } else {
                    debug!("Ignoring update for unknown player {:?}", player.id);
                }
            }
            Envelope::Unrecognized { cmd } => {
                warn!(
                    "Unrecognized message {:?} from connection {}",
                    cmd, connection
                );
            }
            other => {
                warn!(
                    "Unexpected {} message from connection {}",
                    other.tag(),
                    connection
                );
            }
        }
    }

    fn handle_disconnect(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.state = SlotState::Disconnected;
        let dropped_id = slot.player_id.clone();
        info!("Player {} disconnected", dropped_id);

        self.registry.remove(&dropped_id);
        self.broadcast_to_live(&Envelope::PlayerDropped { dropped_id });
    }

    fn broadcast_server_update(&mut self) {
        let envelope = Envelope::ServerUpdate {
            players: self.registry.snapshot(),
        };
        self.broadcast_to_live(&envelope);
    }

    fn send(&mut self, connection: ConnectionId, envelope: &Envelope) {
        match encode(envelope) {
            Ok(bytes) => {
                if let Err(e) = self.transport.send(connection, &bytes) {
                    warn!(
                        "Failed to send {} to connection {}: {}",
                        envelope.tag(),
                        connection,
                        e
                    );
                }
            }
            Err(e) => error!("Failed to encode {}: {}", envelope.tag(), e),
        }
    }

    /// Encodes once and sends to every slot that is still live.
    fn broadcast_to_live(&mut self, envelope: &Envelope) {
        let bytes = match encode(envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode {}: {}", envelope.tag(), e);
                return;
            }
        };

        for slot in self.slots.iter().filter(|slot| slot.is_live()) {
            if let Err(e) = self.transport.send(slot.connection, &bytes) {
                warn!(
                    "Failed to send {} to connection {}: {}",
                    envelope.tag(),
                    slot.connection,
                    e
                );
            }
        }
    }
}
