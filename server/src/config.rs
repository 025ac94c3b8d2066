use shared::{BROADCAST_INTERVAL, CONNECTION_TIMEOUT, DEFAULT_PORT};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often every live connection receives the full player list.
    pub broadcast_interval: Duration,
    /// How often the authority cycle runs.
    pub frame_duration: Duration,
    pub max_clients: usize,
    pub connection_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            broadcast_interval: BROADCAST_INTERVAL,
            frame_duration: Duration::from_millis(16),
            max_clients: 32,
            connection_timeout: CONNECTION_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
