//! [`ServerTransport`] over UDP.

use log::{debug, info, warn};
use shared::transport::udp::{Frame, UdpEndpoint};
use shared::{ConnectionId, ServerTransport, TransportError, TransportEvent};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::client_manager::ClientManager;

pub struct UdpServerTransport {
    endpoint: UdpEndpoint,
    clients: ClientManager,
    pending_accept: VecDeque<ConnectionId>,
    timeout: Duration,
}

impl UdpServerTransport {
    pub async fn bind(
        addr: &str,
        max_clients: usize,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let endpoint = UdpEndpoint::bind(addr).await?;
        info!("Server listening on {}", endpoint.local_addr());

        Ok(Self {
            endpoint,
            clients: ClientManager::new(max_clients),
            pending_accept: VecDeque::new(),
            timeout,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    fn reply(&self, addr: SocketAddr, frame: Frame) {
        if let Err(e) = self.endpoint.send(addr, frame) {
            warn!("Failed to queue frame for {}: {}", addr, e);
        }
    }

    fn handle_frame(&mut self, addr: SocketAddr, frame: Frame, now: Instant) {
        match frame {
            Frame::Connect => match self.clients.find_client_by_addr(addr) {
                // the Accept was lost; answer again with the same id
                Some(id) => self.reply(
                    addr,
                    Frame::Accept {
                        connection_id: id.into_inner(),
                    },
                ),
                None => match self.clients.add_client(addr, now) {
                    Some(id) => {
                        self.pending_accept.push_back(id);
                        self.reply(
                            addr,
                            Frame::Accept {
                                connection_id: id.into_inner(),
                            },
                        );
                    }
                    None => {
                        warn!("Rejecting {}: server full", addr);
                        self.reply(addr, Frame::Disconnect);
                    }
                },
            },
            Frame::Data(bytes) => match self.clients.find_client_by_addr(addr) {
                Some(id) => {
                    self.clients
                        .push_event(id, TransportEvent::Data(bytes), now);
                }
                None => debug!("Ignoring data from unconnected {}", addr),
            },
            Frame::Disconnect => {
                if let Some(id) = self.clients.find_client_by_addr(addr) {
                    self.clients
                        .push_event(id, TransportEvent::Disconnected, now);
                }
            }
            Frame::Accept { .. } => warn!("Unexpected accept frame from {}", addr),
        }
    }
}

impl ServerTransport for UdpServerTransport {
    fn update(&mut self, now: Instant) {
        while let Some((addr, frame)) = self.endpoint.try_recv() {
            self.handle_frame(addr, frame, now);
        }
        for (_, addr) in self.clients.check_timeouts(now, self.timeout) {
            self.reply(addr, Frame::Disconnect);
        }
    }

    fn accept(&mut self) -> Option<ConnectionId> {
        self.pending_accept.pop_front()
    }

    fn pop_event(&mut self, connection: ConnectionId) -> Option<TransportEvent> {
        self.clients.pop_event(connection)
    }

    fn send(&mut self, connection: ConnectionId, payload: &[u8]) -> Result<(), TransportError> {
        let addr = self
            .clients
            .addr_of(connection)
            .ok_or(TransportError::UnknownConnection(connection))?;
        self.endpoint.send(addr, Frame::Data(payload.to_vec()))
    }

    fn disconnect(&mut self, connection: ConnectionId) {
        if let Some(client) = self.clients.remove_client(connection) {
            if !client.closed {
                self.reply(client.addr, Frame::Disconnect);
            }
        }
    }
}
