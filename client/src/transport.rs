//! [`ClientTransport`] over UDP.
//!
//! The link is opened with a `Connect` frame that is re-sent until the
//! server answers with `Accept` or the attempts run out. Once accepted, the
//! link is considered dead after a period with no inbound frames.

use log::{debug, info, warn};
use shared::transport::udp::{Frame, UdpEndpoint};
use shared::{ClientTransport, ConnectionId, TransportError, TransportEvent};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_CONNECT_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Connecting { attempts: u32, next_attempt: Instant },
    /// The id is unknown when data arrived ahead of the `Accept`.
    Connected { connection_id: Option<ConnectionId> },
    Closed,
}

pub struct UdpClientTransport {
    endpoint: UdpEndpoint,
    server_addr: SocketAddr,
    link: Link,
    last_seen: Instant,
    timeout: Duration,
    events: VecDeque<TransportEvent>,
}

impl UdpClientTransport {
    /// Resolves `server`, binds an ephemeral local socket and sends the first
    /// `Connect` frame. The returned transport is still connecting.
    pub async fn connect(server: &str, timeout: Duration) -> Result<Self, TransportError> {
        let resolve_error = |reason: String| TransportError::Resolve {
            addr: server.to_string(),
            reason,
        };
        let server_addr = tokio::net::lookup_host(server)
            .await
            .map_err(|e| resolve_error(e.to_string()))?
            .next()
            .ok_or_else(|| resolve_error("no addresses found".to_string()))?;

        let local = if server_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let endpoint = UdpEndpoint::bind(local).await?;
        info!("Connecting to {} from {}", server_addr, endpoint.local_addr());

        let now = Instant::now();
        endpoint.send(server_addr, Frame::Connect)?;

        Ok(Self {
            endpoint,
            server_addr,
            link: Link::Connecting {
                attempts: 1,
                next_attempt: now + CONNECT_RETRY_INTERVAL,
            },
            last_seen: now,
            timeout,
            events: VecDeque::new(),
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// The id the server assigned, once accepted.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self.link {
            Link::Connected { connection_id } => connection_id,
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected { .. })
    }

    fn close(&mut self) {
        if self.link != Link::Closed {
            self.link = Link::Closed;
            self.events.push_back(TransportEvent::Disconnected);
        }
    }

    fn handle_frame(&mut self, frame: Frame, now: Instant) {
        match (frame, self.link) {
            (Frame::Accept { connection_id }, Link::Connecting { .. }) => {
                let connection_id = ConnectionId::new(connection_id);
                info!("Connected to {} as {}", self.server_addr, connection_id);
                self.link = Link::Connected {
                    connection_id: Some(connection_id),
                };
                self.last_seen = now;
                self.events.push_back(TransportEvent::Connected);
            }
            (Frame::Accept { connection_id }, Link::Connected { connection_id: known }) => {
                // answer to a retried Connect, or the Accept that lost the race
                if known.is_none() {
                    self.link = Link::Connected {
                        connection_id: Some(ConnectionId::new(connection_id)),
                    };
                }
                self.last_seen = now;
            }
            (Frame::Data(bytes), Link::Connecting { .. }) => {
                // the server only sends data after accepting us
                info!("Connected to {} (data before accept)", self.server_addr);
                self.link = Link::Connected {
                    connection_id: None,
                };
                self.last_seen = now;
                self.events.push_back(TransportEvent::Connected);
                self.events.push_back(TransportEvent::Data(bytes));
            }
            (Frame::Data(bytes), Link::Connected { .. }) => {
                self.last_seen = now;
                self.events.push_back(TransportEvent::Data(bytes));
            }
            (Frame::Disconnect, Link::Connecting { .. } | Link::Connected { .. }) => {
                info!("Server {} closed the connection", self.server_addr);
                self.close();
            }
            (Frame::Connect, _) => warn!("Unexpected connect frame from {}", self.server_addr),
            (frame, link) => debug!("Ignoring {:?} while {:?}", frame, link),
        }
    }
}

impl ClientTransport for UdpClientTransport {
    fn update(&mut self, now: Instant) {
        while let Some((addr, frame)) = self.endpoint.try_recv() {
            if addr != self.server_addr {
                debug!("Ignoring frame from {}", addr);
                continue;
            }
            self.handle_frame(frame, now);
        }

        match self.link {
            Link::Connecting {
                attempts,
                next_attempt,
            } if now >= next_attempt => {
                if attempts >= MAX_CONNECT_ATTEMPTS {
                    warn!(
                        "No answer from {} after {} attempts",
                        self.server_addr, attempts
                    );
                    self.close();
                } else if let Err(e) = self.endpoint.send(self.server_addr, Frame::Connect) {
                    warn!("Failed to send connect: {}", e);
                    self.close();
                } else {
                    debug!("Retrying connect to {} ({})", self.server_addr, attempts + 1);
                    self.link = Link::Connecting {
                        attempts: attempts + 1,
                        next_attempt: now + CONNECT_RETRY_INTERVAL,
                    };
                }
            }
            Link::Connected { .. } if now.saturating_duration_since(self.last_seen) > self.timeout => {
                warn!("Connection to {} timed out", self.server_addr);
                self.close();
            }
            _ => {}
        }
    }

    fn pop_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.endpoint
            .send(self.server_addr, Frame::Data(payload.to_vec()))
    }

    /// Tells the server we are leaving. No local event is queued.
    fn disconnect(&mut self) {
        if self.link != Link::Closed {
            if let Err(e) = self.endpoint.send(self.server_addr, Frame::Disconnect) {
                debug!("Disconnect frame not sent: {}", e);
            }
            self.link = Link::Closed;
        }
    }
}
