use clap::Parser;
use client::config::ClientConfig;
use client::network::Client;
use log::{error, info};
use macroquad::prelude::Conf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:9000")]
    server: String,

    /// Milliseconds between position reports
    #[arg(short = 'r', long, default_value = "300")]
    report_interval_ms: u64,

    /// Seconds of silence before the connection is considered lost
    #[arg(short = 't', long, default_value = "5")]
    timeout_secs: u64,

    /// Movement speed in units per second
    #[arg(long, default_value = "5.0")]
    speed: f32,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        ClientConfig {
            server: args.server,
            report_interval: Duration::from_millis(args.report_interval_ms),
            connection_timeout: Duration::from_secs(args.timeout_secs),
            speed: args.speed,
        }
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Player Sync".to_owned(),
        window_width: 1024,
        window_height: 768,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::from(Args::parse());
    info!("Starting client...");
    info!("Connecting to: {}", config.server);

    let mut client = match Client::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to start client: {}", e);
            return;
        }
    };

    client.run().await;
}
