//! Per-address connection table behind the UDP server transport.
//!
//! UDP has no connections, so the table supplies them: a `Connect` datagram
//! from a new address opens an entry, later datagrams from that address are
//! queued on it, and an entry that stays silent past the timeout is closed.
//! The authority never sees addresses, only the [`ConnectionId`]s handed out
//! here.

use log::info;
use shared::{ConnectionId, TransportEvent};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One connected peer as seen by the transport.
#[derive(Debug)]
pub struct Client {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    /// Last time any datagram arrived from this address.
    pub last_seen: Instant,
    /// Events waiting for the authority to pop them.
    pub pending: VecDeque<TransportEvent>,
    /// Set once a `Disconnected` event has been queued.
    pub closed: bool,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, now: Instant) -> Self {
        Self {
            id,
            addr,
            last_seen: now,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    /// Silent for longer than `timeout`.
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }

    /// Queues the final event. Later calls are no-ops.
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.pending.push_back(TransportEvent::Disconnected);
        }
    }
}

/// Connection table keyed by [`ConnectionId`], capped at `max_clients`
/// open entries.
pub struct ClientManager {
    clients: HashMap<ConnectionId, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    /// Ids start at 1 and are never reused.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Opens an entry for a new address. Returns `None` at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, now: Instant) -> Option<ConnectionId> {
        if self.open_count() >= self.max_clients {
            return None;
        }

        let id = ConnectionId::new(self.next_client_id);
        self.next_client_id += 1;

        info!("Client {} connected from {}", id, addr);
        self.clients.insert(id, Client::new(id, addr, now));
        Some(id)
    }

    /// Drops an entry outright, discarding anything still queued.
    pub fn remove_client(&mut self, id: ConnectionId) -> Option<Client> {
        let client = self.clients.remove(&id)?;
        info!("Client {} removed", id);
        Some(client)
    }

    /// Finds the open entry for an address. Closed entries are skipped so a
    /// peer reconnecting from the same address gets a fresh connection.
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ConnectionId> {
        self.clients
            .values()
            .find(|client| client.addr == addr && !client.closed)
            .map(|client| client.id)
    }

    /// The address data for `id` is sent to. `None` once the entry is
    /// closed, even while its last events are still queued.
    pub fn addr_of(&self, id: ConnectionId) -> Option<SocketAddr> {
        self.clients
            .get(&id)
            .filter(|client| !client.closed)
            .map(|client| client.addr)
    }

    /// Marks an address as alive and queues an event on its entry.
    pub fn push_event(&mut self, id: ConnectionId, event: TransportEvent, now: Instant) -> bool {
        match self.clients.get_mut(&id) {
            Some(client) if !client.closed => {
                client.last_seen = now;
                if event == TransportEvent::Disconnected {
                    client.close();
                } else {
                    client.pending.push_back(event);
                }
                true
            }
            _ => false,
        }
    }

    /// Pops the next event. The entry is dropped once its `Disconnected`
    /// event has been handed out.
    pub fn pop_event(&mut self, id: ConnectionId) -> Option<TransportEvent> {
        let client = self.clients.get_mut(&id)?;
        let event = client.pending.pop_front()?;
        if event == TransportEvent::Disconnected {
            self.remove_client(id);
        }
        Some(event)
    }

    /// Closes every entry that has been silent past `timeout`.
    ///
    /// Returns the id and address of each newly closed entry so the caller
    /// can tell the peer it has been dropped. Entries that were already
    /// closed are not reported again.
    pub fn check_timeouts(
        &mut self,
        now: Instant,
        timeout: Duration,
    ) -> Vec<(ConnectionId, SocketAddr)> {
        let mut timed_out = Vec::new();

        for client in self.clients.values_mut() {
            if !client.closed && client.is_timed_out(now, timeout) {
                info!("Client {} timed out", client.id);
                client.close();
                timed_out.push((client.id, client.addr));
            }
        }

        timed_out
    }

    /// Entries that have not been closed.
    pub fn open_count(&self) -> usize {
        self.clients.values().filter(|client| !client.closed).count()
    }

    /// All entries, including closed ones not yet drained.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
