//! Integration tests for the authority and its peers
//!
//! These tests run the server and client crates against each other, first
//! over the in-memory hub and then over real UDP sockets on loopback.

use assert_approx_eq::assert_approx_eq;
use client::session::{EntityRenderer, LocalInput, PeerSession, SessionState};
use client::transport::UdpClientTransport;
use server::authority::Authority;
use server::transport::UdpServerTransport;
use shared::transport::memory::{MemoryClientTransport, MemoryHub, MemoryServerTransport};
use shared::{
    decode, encode, ClientTransport, Envelope, PlayerState, Rgb, TransportEvent, Vec3,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;

const BROADCAST: Duration = Duration::from_millis(300);

/// Keeps every entity in a map so tests can inspect the rendered scene.
#[derive(Default)]
struct SceneLog {
    next: u32,
    entities: HashMap<u32, Vec3>,
}

impl EntityRenderer for SceneLog {
    type Handle = u32;

    fn create_entity(&mut self, _color: Rgb, position: Vec3) -> u32 {
        self.next += 1;
        self.entities.insert(self.next, position);
        self.next
    }

    fn set_position(&mut self, handle: &u32, position: Vec3) {
        self.entities.insert(*handle, position);
    }

    fn destroy_entity(&mut self, handle: u32) {
        self.entities.remove(&handle);
    }
}

struct Stick(Vec3);

impl LocalInput for Stick {
    fn current_local_position(&mut self) -> Vec3 {
        self.0
    }
}

fn red() -> Rgb {
    Rgb::new(1.0, 0.0, 0.0)
}

/// Drains a raw client, decoding every data event.
fn drain(client: &mut MemoryClientTransport) -> Vec<Envelope> {
    let mut out = Vec::new();
    while let Some(event) = client.pop_event() {
        if let TransportEvent::Data(bytes) = event {
            out.push(decode(&bytes).unwrap());
        }
    }
    out
}

fn send(client: &mut MemoryClientTransport, envelope: &Envelope) {
    client.send(&encode(envelope).unwrap()).unwrap();
}

/// WIRE FORMAT TESTS
mod wire_tests {
    use super::*;

    #[test]
    fn envelopes_are_tagged_json() {
        let bytes = encode(&Envelope::PlayerInit {
            your_id: "1".to_string(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cmd"], "PLAYER_INIT");
        assert_eq!(value["your_id"], "1");

        let bytes = encode(&Envelope::ServerUpdate {
            players: vec![PlayerState::new("1", red(), Vec3::new(1.0, 2.0, 3.0))],
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cmd"], "SERVER_UPDATE");
        assert_eq!(value["players"][0]["id"], "1");
        assert_eq!(value["players"][0]["position"]["z"], 3.0);
    }

    #[test]
    fn hand_written_handshake_decodes() {
        let text = br#"{
            "cmd": "HANDSHAKE",
            "player": {
                "id": "1",
                "color": {"r": 1.0, "g": 0.0, "b": 0.0},
                "position": {"x": 0.0, "y": 0.0, "z": 0.0}
            }
        }"#;
        match decode(text).unwrap() {
            Envelope::Handshake { player } => {
                assert_eq!(player.id, "1");
                assert_eq!(player.color, red());
                assert_eq!(player.position, Vec3::ZERO);
            }
            other => panic!("expected handshake, got {:?}", other),
        }
    }
}

/// AUTHORITY AND PEERS OVER THE IN-MEMORY HUB
mod sync_tests {
    use super::*;

    fn authority(hub: &MemoryHub) -> Authority<MemoryServerTransport> {
        Authority::new(hub.server(), BROADCAST)
    }

    fn session(
        hub: &MemoryHub,
        position: Vec3,
    ) -> PeerSession<MemoryClientTransport, SceneLog, Stick> {
        PeerSession::with_color(hub.connect(), SceneLog::default(), Stick(position), red(), BROADCAST)
    }

    /// Two raw peers join, both see both players, one leaves.
    #[test]
    fn two_peer_scenario() {
        let hub = MemoryHub::new();
        let mut authority = authority(&hub);
        let t0 = Instant::now();

        let mut a = hub.connect();
        authority.update(t0);
        let a_init = drain(&mut a);
        assert_eq!(
            a_init[0],
            Envelope::PlayerInit {
                your_id: "1".to_string()
            }
        );
        send(
            &mut a,
            &Envelope::Handshake {
                player: PlayerState::new("1", red(), Vec3::ZERO),
            },
        );

        let mut b = hub.connect();
        authority.update(t0 + Duration::from_millis(10));
        assert_eq!(
            drain(&mut b),
            vec![Envelope::PlayerInit {
                your_id: "2".to_string()
            }]
        );
        send(
            &mut b,
            &Envelope::Handshake {
                player: PlayerState::new("2", red(), Vec3::ZERO),
            },
        );
        drain(&mut a);

        authority.update(t0 + BROADCAST);
        for peer in [&mut a, &mut b] {
            let received = drain(peer);
            assert_eq!(received.len(), 1);
            match &received[0] {
                Envelope::ServerUpdate { players } => {
                    let ids: Vec<&str> = players.iter().map(|p| p.id.as_str()).collect();
                    assert_eq!(ids, vec!["1", "2"]);
                }
                other => panic!("expected server update, got {:?}", other),
            }
        }

        b.disconnect();
        authority.update(t0 + BROADCAST + Duration::from_millis(10));
        assert_eq!(
            drain(&mut a),
            vec![Envelope::PlayerDropped {
                dropped_id: "2".to_string()
            }]
        );
        assert!(!authority.registry().contains("2"));
        assert_eq!(authority.registry().len(), 1);
    }

    #[test]
    fn sessions_converge_and_drop() {
        let hub = MemoryHub::new();
        let mut authority = authority(&hub);
        let mut a = session(&hub, Vec3::new(1.0, 0.0, 0.0));
        let mut b = session(&hub, Vec3::new(2.0, 0.0, 0.0));
        let t0 = Instant::now();

        // accept + init, handshakes, first populated broadcast
        let mut now = t0;
        for _ in 0..3 {
            authority.update(now);
            a.update(now);
            b.update(now);
            now += BROADCAST;
        }

        assert_eq!(a.state(), SessionState::Handshaken);
        assert_eq!(a.local_player().id, "1");
        assert_eq!(b.local_player().id, "2");
        assert_eq!(a.remote_ids(), vec!["2"]);
        assert_eq!(b.remote_ids(), vec!["1"]);
        assert_eq!(a.renderer().entities.len(), 2);

        b.shutdown();
        authority.update(now);
        a.update(now);

        assert!(a.remote_ids().is_empty());
        assert_eq!(a.renderer().entities.len(), 1);
        assert_eq!(authority.registry().len(), 1);
    }

    #[test]
    fn position_reaches_other_peers() {
        let hub = MemoryHub::new();
        let mut authority = authority(&hub);
        let mut a = session(&hub, Vec3::ZERO);
        let mut b = session(&hub, Vec3::ZERO);
        let mut c = session(&hub, Vec3::ZERO);

        let mut now = Instant::now();
        let cycle = |authority: &mut Authority<MemoryServerTransport>,
                         peers: [&mut PeerSession<MemoryClientTransport, SceneLog, Stick>; 3],
                         now: Instant| {
            authority.update(now);
            for peer in peers {
                peer.update(now);
            }
        };

        for _ in 0..3 {
            cycle(&mut authority, [&mut a, &mut b, &mut c], now);
            now += BROADCAST;
        }

        a.input_mut().0 = Vec3::new(4.0, 0.0, -2.0);
        // one report from a, then one broadcast from the authority
        for _ in 0..2 {
            cycle(&mut authority, [&mut a, &mut b, &mut c], now);
            now += BROADCAST;
        }

        let reported = authority.registry().get("1").unwrap().position;
        assert_approx_eq!(reported.x, 4.0);
        assert_approx_eq!(reported.z, -2.0);
        for peer in [&b, &c] {
            let seen = peer.remote_player("1").unwrap().position;
            assert_approx_eq!(seen.x, reported.x);
            assert_approx_eq!(seen.y, reported.y);
            assert_approx_eq!(seen.z, reported.z);
        }
    }

    #[test]
    fn repeated_broadcast_is_idempotent() {
        let hub = MemoryHub::new();
        let mut authority = authority(&hub);
        let mut a = session(&hub, Vec3::ZERO);
        let mut b = session(&hub, Vec3::ZERO);

        let mut now = Instant::now();
        for _ in 0..3 {
            authority.update(now);
            a.update(now);
            b.update(now);
            now += BROADCAST;
        }
        let before = (a.remote_ids().len(), a.renderer().entities.len());

        // each cycle delivers one more copy of the same snapshot
        for _ in 0..3 {
            authority.update(now);
            a.update(now);
            b.update(now);
            now += BROADCAST;
        }
        assert_eq!((a.remote_ids().len(), a.renderer().entities.len()), before);
        assert_eq!(a.remote_ids(), vec!["2"]);
    }

    #[test]
    fn unknown_tag_changes_nothing() {
        let hub = MemoryHub::new();
        let mut authority = authority(&hub);
        let mut raw = hub.connect();
        let t0 = Instant::now();

        authority.update(t0);
        drain(&mut raw);
        send(
            &mut raw,
            &Envelope::Handshake {
                player: PlayerState::new("1", red(), Vec3::ZERO),
            },
        );
        authority.update(t0 + Duration::from_millis(10));
        let before = authority.registry().snapshot();

        raw.send(br#"{"cmd":"CHAT","text":"hi"}"#).unwrap();
        raw.send(b"{not json").unwrap();
        authority.update(t0 + Duration::from_millis(20));

        assert_eq!(authority.registry().snapshot(), before);
        assert_eq!(authority.connection_count(), 1);
    }

    #[test]
    fn empty_registry_broadcasts_empty_list() {
        let hub = MemoryHub::new();
        let mut authority = authority(&hub);
        let mut raw = hub.connect();

        authority.update(Instant::now());
        let received = drain(&mut raw);
        assert!(received.contains(&Envelope::ServerUpdate { players: vec![] }));
    }
}

/// REAL UDP ON LOOPBACK
mod udp_tests {
    use super::*;
    use tokio_test::assert_ok;

    type UdpSession = PeerSession<UdpClientTransport, SceneLog, Stick>;

    async fn pump_until<F>(
        authority: &mut Authority<UdpServerTransport>,
        peers: &mut [&mut UdpSession],
        mut done: F,
    ) -> bool
    where
        F: FnMut(&Authority<UdpServerTransport>, &[&mut UdpSession]) -> bool,
    {
        for _ in 0..300 {
            let now = Instant::now();
            authority.update(now);
            for peer in peers.iter_mut() {
                peer.update(now);
            }
            if done(authority, peers) {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn peer(server: &str, position: Vec3) -> UdpSession {
        let transport = assert_ok!(UdpClientTransport::connect(server, Duration::from_secs(5)).await);
        PeerSession::with_color(
            transport,
            SceneLog::default(),
            Stick(position),
            red(),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn peers_sync_over_udp() {
        let transport =
            assert_ok!(UdpServerTransport::bind("127.0.0.1:0", 8, Duration::from_secs(5)).await);
        let server_addr = transport.local_addr().to_string();
        let mut authority = Authority::new(transport, Duration::from_millis(50));

        let mut a = peer(&server_addr, Vec3::new(1.0, 0.0, 0.0)).await;
        let mut b = peer(&server_addr, Vec3::new(2.0, 0.0, 0.0)).await;

        let joined = pump_until(&mut authority, &mut [&mut a, &mut b], |auth, peers| {
            auth.registry().len() == 2 && peers.iter().all(|p| p.remote_count() == 1)
        })
        .await;
        assert!(joined, "peers never saw each other");

        let a_id = a.local_player().id.clone();
        a.input_mut().0 = Vec3::new(5.0, 0.0, 5.0);
        let moved = pump_until(&mut authority, &mut [&mut a, &mut b], |_, peers| {
            peers[1]
                .remote_player(&a_id)
                .map(|p| p.position == Vec3::new(5.0, 0.0, 5.0))
                .unwrap_or(false)
        })
        .await;
        assert!(moved, "position never reached the other peer");

        a.shutdown();
        let dropped = pump_until(&mut authority, &mut [&mut b], |auth, peers| {
            auth.registry().len() == 1 && peers[0].remote_count() == 0
        })
        .await;
        assert!(dropped, "disconnect never propagated");
    }

    #[tokio::test]
    async fn client_gives_up_without_server() {
        // bound but never answering
        let silent = assert_ok!(std::net::UdpSocket::bind("127.0.0.1:0"));
        let addr = assert_ok!(silent.local_addr()).to_string();
        let mut transport =
            assert_ok!(UdpClientTransport::connect(&addr, Duration::from_secs(5)).await);

        let mut now = Instant::now();
        let mut events = Vec::new();
        for _ in 0..20 {
            now += Duration::from_millis(500);
            transport.update(now);
            while let Some(event) = transport.pop_event() {
                events.push(event);
            }
        }
        assert_eq!(events, vec![TransportEvent::Disconnected]);
    }
}
