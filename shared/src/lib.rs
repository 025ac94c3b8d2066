//! Types shared by the authority and its peers: the player data model, the
//! command-tagged message envelope, the transport abstraction and the
//! cancellable periodic ticker both sides run their timed work on.

pub mod message;
pub mod player;
pub mod tick;
pub mod transport;

use std::time::Duration;

pub use message::{decode, encode, Command, Envelope, ProtocolError};
pub use player::{PlayerState, Rgb, Vec3};
pub use tick::Ticker;
pub use transport::{
    ClientTransport, ConnectionId, ServerTransport, TransportError, TransportEvent,
};

pub const DEFAULT_PORT: u16 = 9000;
/// Cadence of the authority's full-state broadcast.
pub const BROADCAST_INTERVAL: Duration = Duration::from_millis(300);
/// Cadence of a peer's self-report.
pub const REPORT_INTERVAL: Duration = Duration::from_millis(300);
/// A link with no inbound traffic for this long is considered dead.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
