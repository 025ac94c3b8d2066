//! Connection-oriented, possibly lossy message transport.
//!
//! Both sides drive their transport from a single polling cycle: call
//! `update` once, then drain events until `None`. Nothing here blocks; every
//! send is queued and may be lost in transit.

pub mod memory;
pub mod udp;

use std::fmt;
use std::io;
use std::time::Instant;

/// Transport-level identifier of one connection.
///
/// Assigned from a counter starting at 1 and never reused while the
/// transport lives, so it is unique among live connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The outbound connection was accepted. Peers only.
    Connected,
    /// One complete message.
    Data(Vec<u8>),
    /// The link is gone; no further events follow for it.
    Disconnected,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to resolve {addr}: {reason}")]
    Resolve { addr: String, reason: String },

    #[error("not connected")]
    NotConnected,

    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("network task stopped")]
    Closed,
}

/// Listening side of the transport.
pub trait ServerTransport {
    /// Pumps pending I/O and detects dead links.
    fn update(&mut self, now: Instant);

    /// Takes the next newly established connection, if any.
    fn accept(&mut self) -> Option<ConnectionId>;

    /// Takes the next `Data` or `Disconnected` event for one connection.
    fn pop_event(&mut self, connection: ConnectionId) -> Option<TransportEvent>;

    fn send(&mut self, connection: ConnectionId, payload: &[u8]) -> Result<(), TransportError>;

    /// Closes a connection from this side. The remote end is told so; no
    /// local `Disconnected` event is produced.
    fn disconnect(&mut self, connection: ConnectionId);
}

/// Connecting side of the transport: a single outbound connection.
pub trait ClientTransport {
    fn update(&mut self, now: Instant);

    fn pop_event(&mut self) -> Option<TransportEvent>;

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    fn disconnect(&mut self);
}
