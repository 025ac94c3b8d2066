use shared::{CONNECTION_TIMEOUT, DEFAULT_PORT, REPORT_INTERVAL};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the server.
    pub server: String,
    /// How often the local position is reported.
    pub report_interval: Duration,
    pub connection_timeout: Duration,
    /// Movement speed in units per second.
    pub speed: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: format!("127.0.0.1:{}", DEFAULT_PORT),
            report_interval: REPORT_INTERVAL,
            connection_timeout: CONNECTION_TIMEOUT,
            speed: 5.0,
        }
    }
}
