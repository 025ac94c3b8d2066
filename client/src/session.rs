//! The peer side of the protocol.
//!
//! A [`PeerSession`] owns one client transport and drives it from the
//! caller's frame loop. Everything visual goes through an
//! [`EntityRenderer`] and the local position comes from a [`LocalInput`],
//! so the session itself has no window or keyboard dependency.

use log::{debug, info, warn};
use shared::{
    decode, encode, ClientTransport, Envelope, PlayerState, Rgb, Ticker, TransportEvent, Vec3,
};
use std::time::{Duration, Instant};

/// Creates, moves and destroys the visual representation of a player.
pub trait EntityRenderer {
    type Handle;

    fn create_entity(&mut self, color: Rgb, position: Vec3) -> Self::Handle;
    fn set_position(&mut self, handle: &Self::Handle, position: Vec3);
    fn destroy_entity(&mut self, handle: Self::Handle);
}

/// Source of the local player's position.
pub trait LocalInput {
    fn current_local_position(&mut self) -> Vec3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the transport to connect.
    Connecting,
    /// Connected, no id assigned yet.
    Connected,
    /// Id assigned and handshake sent.
    Handshaken,
    /// Terminal. There is no reconnect.
    Disconnected,
}

struct RemotePlayer<H> {
    state: PlayerState,
    handle: H,
}

pub struct PeerSession<T, R, I>
where
    T: ClientTransport,
    R: EntityRenderer,
{
    transport: T,
    renderer: R,
    input: I,
    state: SessionState,
    local: PlayerState,
    local_entity: R::Handle,
    /// Remote players in the order they were first seen.
    remotes: Vec<RemotePlayer<R::Handle>>,
    report: Ticker,
}

impl<T, R, I> PeerSession<T, R, I>
where
    T: ClientTransport,
    R: EntityRenderer,
    I: LocalInput,
{
    /// Starts a session with a random color.
    pub fn connect(transport: T, renderer: R, input: I, report_interval: Duration) -> Self {
        Self::with_color(transport, renderer, input, Rgb::random(), report_interval)
    }

    /// Starts a session. The local player and its entity exist from here on,
    /// whether or not the connection ever completes.
    pub fn with_color(
        transport: T,
        mut renderer: R,
        mut input: I,
        color: Rgb,
        report_interval: Duration,
    ) -> Self {
        let position = input.current_local_position();
        let local = PlayerState::unassigned(color, position);
        let local_entity = renderer.create_entity(color, position);

        Self {
            transport,
            renderer,
            input,
            state: SessionState::Connecting,
            local,
            local_entity,
            remotes: Vec::new(),
            report: Ticker::new(report_interval),
        }
    }

    /// Runs one cycle: transport events, local movement, then the
    /// self-report if it is due.
    pub fn update(&mut self, now: Instant) {
        self.follow_input();
        if self.state == SessionState::Disconnected {
            return;
        }

        self.transport.update(now);
        while let Some(event) = self.transport.pop_event() {
            match event {
                TransportEvent::Connected => self.handle_connected(now),
                TransportEvent::Data(bytes) => match decode(&bytes) {
                    Ok(envelope) => self.handle_message(envelope),
                    Err(e) => warn!("Discarding malformed message: {}", e),
                },
                TransportEvent::Disconnected => {
                    self.handle_disconnected();
                    return;
                }
            }
        }

        if self.report.poll(now) {
            self.report_position();
        }
    }

    /// Disconnects and stops the self-report. Remote entities are destroyed;
    /// the local one is kept.
    pub fn shutdown(&mut self) {
        if self.state != SessionState::Disconnected {
            self.transport.disconnect();
            self.state = SessionState::Disconnected;
            info!("Session closed");
        }
        self.report.cancel();
        for remote in self.remotes.drain(..) {
            self.renderer.destroy_entity(remote.handle);
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The local player. Its id is empty until PLAYER_INIT arrives, and its
    /// position is whatever the input reported on the last cycle.
    pub fn local_player(&self) -> &PlayerState {
        &self.local
    }

    /// A remote player as of the last SERVER_UPDATE.
    pub fn remote_player(&self, id: &str) -> Option<&PlayerState> {
        self.remotes
            .iter()
            .find(|remote| remote.state.id == id)
            .map(|remote| &remote.state)
    }

    /// Ids of every remote player, in the order they were first seen.
    pub fn remote_ids(&self) -> Vec<&str> {
        self.remotes
            .iter()
            .map(|remote| remote.state.id.as_str())
            .collect()
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Whether the periodic PLAYER_UPDATE is running. It starts with the
    /// handshake and stops on disconnect or shutdown.
    pub fn is_reporting(&self) -> bool {
        self.report.is_running()
    }

    /// The underlying transport, e.g. to read the assigned connection id.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable access to the input source, used to steer the local player.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    fn follow_input(&mut self) {
        let position = self.input.current_local_position();
        self.local.position = position;
        self.renderer.set_position(&self.local_entity, position);
    }

    fn handle_connected(&mut self, now: Instant) {
        if self.state == SessionState::Connecting {
            info!("Connected, waiting for player id");
            self.state = SessionState::Connected;
            self.report.start(now);
        }
    }

    fn handle_disconnected(&mut self) {
        info!("Disconnected from server");
        self.state = SessionState::Disconnected;
        self.report.cancel();
    }

    fn handle_message(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::PlayerInit { your_id } => self.handle_player_init(your_id),
            Envelope::ServerUpdate { players } => self.apply_server_update(players),
            Envelope::PlayerDropped { dropped_id } => self.drop_remote(&dropped_id),
            Envelope::Unrecognized { cmd } => warn!("Ignoring unrecognized command {}", cmd),
            other => warn!("Ignoring unexpected {} from server", other.tag()),
        }
    }

    fn handle_player_init(&mut self, id: String) {
        info!("Assigned player id {}", id);
        self.local.id = id;
        self.state = SessionState::Handshaken;
        self.send(&Envelope::Handshake {
            player: self.local.clone(),
        });
    }

    /// Own id is skipped, known ids are moved, unknown ids are created, and
    /// remotes missing from the list are destroyed.
    fn apply_server_update(&mut self, players: Vec<PlayerState>) {
        if !self.local.has_id() {
            debug!("Ignoring server update before player init");
            return;
        }

        for player in &players {
            if player.id == self.local.id {
                continue;
            }

            match self.remotes.iter_mut().find(|r| r.state.id == player.id) {
                Some(remote) => {
                    remote.state.position = player.position;
                    self.renderer.set_position(&remote.handle, player.position);
                }
                None => {
                    info!("Player {} appeared", player.id);
                    let handle = self.renderer.create_entity(player.color, player.position);
                    self.remotes.push(RemotePlayer {
                        state: player.clone(),
                        handle,
                    });
                }
            }
        }

        let mut index = 0;
        while index < self.remotes.len() {
            if players.iter().any(|p| p.id == self.remotes[index].state.id) {
                index += 1;
            } else {
                let remote = self.remotes.remove(index);
                info!("Player {} missing from update, removing", remote.state.id);
                self.renderer.destroy_entity(remote.handle);
            }
        }
    }

    fn drop_remote(&mut self, id: &str) {
        match self.remotes.iter().position(|r| r.state.id == id) {
            Some(index) => {
                let remote = self.remotes.remove(index);
                info!("Player {} left", id);
                self.renderer.destroy_entity(remote.handle);
            }
            None => debug!("Drop for unknown player {}", id),
        }
    }

    fn report_position(&mut self) {
        if !self.local.has_id() {
            debug!("Skipping position report: no player id yet");
            return;
        }
        self.send(&Envelope::PlayerUpdate {
            player: self.local.clone(),
        });
    }

    fn send(&mut self, envelope: &Envelope) {
        let payload = match encode(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode {}: {}", envelope.tag(), e);
                return;
            }
        };
        if let Err(e) = self.transport.send(&payload) {
            warn!("Failed to send {}: {}", envelope.tag(), e);
        }
    }
}

impl<T, R, I> Drop for PeerSession<T, R, I>
where
    T: ClientTransport,
    R: EntityRenderer,
{
    fn drop(&mut self) {
        if self.state != SessionState::Disconnected {
            self.transport.disconnect();
        }
    }
}
