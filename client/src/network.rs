//! The windowed client: one [`PeerSession`] driven from the macroquad frame
//! loop, with the UDP I/O tasks on a separate tokio runtime.

use crate::config::ClientConfig;
use crate::input::KeyboardMover;
use crate::rendering::{HudInfo, SceneRenderer};
use crate::session::{PeerSession, SessionState};
use crate::transport::UdpClientTransport;
use log::info;
use macroquad::prelude::{is_key_pressed, is_quit_requested, next_frame, prevent_quit, KeyCode};
use shared::Vec3;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// Time given to the sender task to flush the disconnect frame.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

pub struct Client {
    session: PeerSession<UdpClientTransport, SceneRenderer, KeyboardMover>,
    // dropped after the session so the endpoint tasks outlive it
    _runtime: Runtime,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let runtime = Runtime::new()?;
        let transport = runtime.block_on(UdpClientTransport::connect(
            &config.server,
            config.connection_timeout,
        ))?;

        let session = PeerSession::connect(
            transport,
            SceneRenderer::new(),
            KeyboardMover::new(Vec3::ZERO, config.speed),
            config.report_interval,
        );

        Ok(Client {
            session,
            _runtime: runtime,
        })
    }

    fn status(&self) -> &'static str {
        match self.session.state() {
            SessionState::Connecting => "connecting",
            SessionState::Connected => "waiting for id",
            SessionState::Handshaken => "connected",
            SessionState::Disconnected => "disconnected",
        }
    }

    /// Runs until Escape is pressed or the window is closed.
    pub async fn run(&mut self) {
        prevent_quit();
        info!("Controls: WASD or arrow keys to move, Escape to quit");

        loop {
            if is_key_pressed(KeyCode::Escape) || is_quit_requested() {
                break;
            }

            self.session.update(Instant::now());

            let local = self.session.local_player();
            let hud = HudInfo {
                player_id: &local.id,
                status: self.status(),
                remote_players: self.session.remote_count(),
            };
            self.session.renderer().render(local.position, &hud);

            next_frame().await;
        }

        self.session.shutdown();
        std::thread::sleep(SHUTDOWN_GRACE);
    }
}
