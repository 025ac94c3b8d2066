use clap::Parser;
use log::error;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,
    /// Milliseconds between full-state broadcasts
    #[clap(short, long, default_value = "300")]
    broadcast_interval_ms: u64,
    /// Milliseconds between authority cycles
    #[clap(short, long, default_value = "16")]
    frame_ms: u64,
    /// Maximum number of simultaneous connections
    #[clap(short, long, default_value = "32")]
    max_clients: usize,
    /// Seconds of silence before a connection is dropped
    #[clap(short, long, default_value = "5")]
    timeout_secs: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            broadcast_interval: Duration::from_millis(args.broadcast_interval_ms),
            frame_duration: Duration::from_millis(args.frame_ms),
            max_clients: args.max_clients,
            connection_timeout: Duration::from_secs(args.timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig::from(Args::parse());
    let mut server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_addr(), e);
            return Err(e);
        }
    };

    server.run().await
}
