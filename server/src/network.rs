//! Drives the authority over UDP until shutdown.

use crate::authority::Authority;
use crate::config::ServerConfig;
use crate::transport::UdpServerTransport;
use log::{debug, info};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Time given to the sender task to flush disconnect frames on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

pub struct Server {
    authority: Authority<UdpServerTransport>,
    frame_duration: Duration,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let transport = UdpServerTransport::bind(
            &config.bind_addr(),
            config.max_clients,
            config.connection_timeout,
        )
        .await?;

        Ok(Server {
            authority: Authority::new(transport, config.broadcast_interval),
            frame_duration: config.frame_duration,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.authority.transport().local_addr()
    }

    pub fn authority(&self) -> &Authority<UdpServerTransport> {
        &self.authority
    }

    /// Runs the authority cycle until Ctrl-C.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let shutdown = tokio::signal::ctrl_c();
        self.run_until(shutdown).await
    }

    /// Runs the authority cycle until `shutdown` completes, then disconnects
    /// every peer.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: std::future::Future,
    {
        let mut frame_interval = interval(self.frame_duration);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Server started successfully");
        let mut frames: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                }
                _ = frame_interval.tick() => {
                    self.authority.update(Instant::now());
                    frames += 1;

                    if frames % 600 == 0 {
                        debug!(
                            "Frame {}: {} connections, {} players",
                            frames,
                            self.authority.connection_count(),
                            self.authority.registry().len()
                        );
                    }
                }
            }
        }

        self.authority.shutdown();
        sleep(SHUTDOWN_GRACE).await;
        Ok(())
    }
}
