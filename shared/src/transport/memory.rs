//! In-process transport: every connection is a pair of queues.
//!
//! Delivery is reliable and ordered, which makes it a deterministic stand-in
//! for the network when running an authority and several peers inside one
//! process. [`MemoryHub::sever`] simulates a link failure.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::{ClientTransport, ConnectionId, ServerTransport, TransportError, TransportEvent};

#[derive(Debug, Default)]
struct Link {
    to_server: VecDeque<TransportEvent>,
    to_client: VecDeque<TransportEvent>,
    accepted: bool,
    open: bool,
}

#[derive(Debug, Default)]
struct HubState {
    next_id: u32,
    pending_accept: VecDeque<ConnectionId>,
    links: HashMap<ConnectionId, Link>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The listening end. Every server handle shares the same accept queue.
    pub fn server(&self) -> MemoryServerTransport {
        MemoryServerTransport { hub: self.clone() }
    }

    /// Opens a new connection; it becomes visible to `accept` immediately.
    pub fn connect(&self) -> MemoryClientTransport {
        let mut state = self.lock();
        state.next_id += 1;
        let id = ConnectionId::new(state.next_id);
        state.links.insert(
            id,
            Link {
                open: true,
                ..Link::default()
            },
        );
        state.pending_accept.push_back(id);

        MemoryClientTransport {
            hub: self.clone(),
            id,
        }
    }

    /// Breaks a link as if the network failed: both ends see `Disconnected`.
    pub fn sever(&self, connection: ConnectionId) {
        let mut state = self.lock();
        if let Some(link) = state.links.get_mut(&connection) {
            if link.open {
                link.open = false;
                link.to_server.push_back(TransportEvent::Disconnected);
                link.to_client.push_back(TransportEvent::Disconnected);
            }
        }
    }

    /// Links still held by the hub. A link is released once it is closed
    /// and both ends have drained their queues.
    pub fn link_count(&self) -> usize {
        self.lock().links.len()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HubState {
    /// Pops one event for either end, then releases the link if nothing is
    /// left to deliver on it.
    fn pop(&mut self, id: ConnectionId, to_server: bool) -> Option<TransportEvent> {
        let link = self.links.get_mut(&id)?;
        let event = if to_server {
            link.to_server.pop_front()
        } else {
            link.to_client.pop_front()
        };
        if !link.open && link.to_server.is_empty() && link.to_client.is_empty() {
            self.links.remove(&id);
        }
        event
    }
}

#[derive(Debug, Clone)]
pub struct MemoryServerTransport {
    hub: MemoryHub,
}

impl ServerTransport for MemoryServerTransport {
    fn update(&mut self, _now: Instant) {}

    fn accept(&mut self) -> Option<ConnectionId> {
        let mut state = self.hub.lock();
        while let Some(id) = state.pending_accept.pop_front() {
            match state.links.get_mut(&id) {
                Some(link) if link.open => {
                    link.accepted = true;
                    link.to_client.push_back(TransportEvent::Connected);
                    return Some(id);
                }
                Some(_) => {
                    state.links.remove(&id);
                }
                None => {}
            }
        }
        None
    }

    fn pop_event(&mut self, connection: ConnectionId) -> Option<TransportEvent> {
        self.hub.lock().pop(connection, true)
    }

    fn send(&mut self, connection: ConnectionId, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.hub.lock();
        let link = state
            .links
            .get_mut(&connection)
            .ok_or(TransportError::UnknownConnection(connection))?;
        if !link.open {
            return Err(TransportError::NotConnected);
        }
        link.to_client
            .push_back(TransportEvent::Data(payload.to_vec()));
        Ok(())
    }

    fn disconnect(&mut self, connection: ConnectionId) {
        let mut state = self.hub.lock();
        if let Some(link) = state.links.get_mut(&connection) {
            if link.open {
                link.open = false;
                link.to_server.clear();
                link.to_client.push_back(TransportEvent::Disconnected);
            }
        }
    }
}

#[derive(Debug)]
pub struct MemoryClientTransport {
    hub: MemoryHub,
    id: ConnectionId,
}

impl MemoryClientTransport {
    /// The id the server side sees for this connection.
    pub fn connection_id(&self) -> ConnectionId {
        self.id
    }
}

impl ClientTransport for MemoryClientTransport {
    fn update(&mut self, _now: Instant) {}

    fn pop_event(&mut self) -> Option<TransportEvent> {
        self.hub.lock().pop(self.id, false)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.hub.lock();
        match state.links.get_mut(&self.id) {
            Some(link) if link.open && link.accepted => {
                link.to_server
                    .push_back(TransportEvent::Data(payload.to_vec()));
                Ok(())
            }
            _ => Err(TransportError::NotConnected),
        }
    }

    fn disconnect(&mut self) {
        let mut state = self.hub.lock();
        if let Some(link) = state.links.get_mut(&self.id) {
            if link.open {
                link.open = false;
                link.to_client.clear();
                link.to_server.push_back(TransportEvent::Disconnected);
            }
        }
    }
}
