//! UDP plumbing shared by the server and client transports.
//!
//! [`UdpEndpoint`] owns a tokio socket and two background tasks: one that
//! receives and decodes datagrams, one that encodes and sends them. The
//! polling cycle talks to both through unbounded channels, so it never
//! awaits network I/O itself.

use bincode::{deserialize, serialize};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::TransportError;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Datagram-level framing that gives UDP a connection lifecycle.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Frame {
    /// peer → server: open (or re-request) a connection.
    Connect,
    /// server → peer: the connection is open.
    Accept { connection_id: u32 },
    /// One application message.
    Data(Vec<u8>),
    /// Either direction: the connection is closed.
    Disconnect,
}

impl Frame {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        serialize(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        deserialize(data)
    }
}

#[derive(Debug)]
pub struct UdpEndpoint {
    local_addr: SocketAddr,
    inbound: mpsc::UnboundedReceiver<(SocketAddr, Frame)>,
    outbound: mpsc::UnboundedSender<(SocketAddr, Frame)>,
    receiver: JoinHandle<()>,
    sender: JoinHandle<()>,
}

impl UdpEndpoint {
    /// Binds the socket and spawns the I/O tasks on the current runtime.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let bind_error = |source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        };
        let socket = UdpSocket::bind(addr).await.map_err(bind_error)?;
        let local_addr = socket.local_addr().map_err(bind_error)?;
        let socket = Arc::new(socket);

        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let receiver = tokio::spawn(Self::receive_loop(Arc::clone(&socket), inbound_tx));
        let sender = tokio::spawn(Self::send_loop(socket, outbound_rx));

        Ok(Self {
            local_addr,
            inbound,
            outbound,
            receiver,
            sender,
        })
    }

    async fn receive_loop(
        socket: Arc<UdpSocket>,
        inbound: mpsc::UnboundedSender<(SocketAddr, Frame)>,
    ) {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            match socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => match Frame::from_bytes(&buffer[..len]) {
                    Ok(frame) => {
                        if inbound.send((addr, frame)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping undecodable datagram from {}: {}", addr, e),
                },
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    async fn send_loop(
        socket: Arc<UdpSocket>,
        mut outbound: mpsc::UnboundedReceiver<(SocketAddr, Frame)>,
    ) {
        while let Some((addr, frame)) = outbound.recv().await {
            let data = match frame.to_bytes() {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to encode frame for {}: {}", addr, e);
                    continue;
                }
            };
            if data.len() > MAX_DATAGRAM_SIZE {
                error!(
                    "Dropping {} byte frame for {}: exceeds datagram size",
                    data.len(),
                    addr
                );
                continue;
            }
            if let Err(e) = socket.send_to(&data, addr).await {
                error!("Failed to send to {}: {}", addr, e);
            }
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Takes the next received frame without waiting.
    pub fn try_recv(&mut self) -> Option<(SocketAddr, Frame)> {
        self.inbound.try_recv().ok()
    }

    /// Queues a frame for sending.
    pub fn send(&self, addr: SocketAddr, frame: Frame) -> Result<(), TransportError> {
        self.outbound
            .send((addr, frame))
            .map_err(|_| TransportError::Closed)
    }
}

impl Drop for UdpEndpoint {
    fn drop(&mut self) {
        self.receiver.abort();
        self.sender.abort();
    }
}
