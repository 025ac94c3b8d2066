//! Performance benchmarks for the codec, the registry and the authority cycle

use server::authority::Authority;
use server::registry::PlayerRegistry;
use shared::transport::memory::MemoryHub;
use shared::transport::udp::Frame;
use shared::{decode, encode, ClientTransport, Envelope, PlayerState, Rgb, Vec3};
use std::time::{Duration, Instant};

fn players(count: usize) -> Vec<PlayerState> {
    (0..count)
        .map(|i| {
            PlayerState::new(
                (i + 1).to_string(),
                Rgb::new(0.5, 0.25, 1.0),
                Vec3::new(i as f32, 0.0, -(i as f32)),
            )
        })
        .collect()
}

/// Benchmarks encoding and decoding a full-state broadcast
#[test]
fn benchmark_server_update_codec() {
    let envelope = Envelope::ServerUpdate {
        players: players(32),
    };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = encode(&envelope).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert!(matches!(decoded, Envelope::ServerUpdate { .. }));
    }

    let duration = start.elapsed();
    println!(
        "SERVER_UPDATE codec (32 players): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks the first decode pass rejecting unknown tags
#[test]
fn benchmark_unrecognized_decode() {
    let bytes = br#"{"cmd":"SOMETHING_NEW","payload":[1,2,3,4,5,6,7,8]}"#;

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let decoded = decode(bytes).unwrap();
        assert!(decoded.command().is_none());
    }

    let duration = start.elapsed();
    println!(
        "Unrecognized decode: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks registry position updates
#[test]
fn benchmark_registry_updates() {
    let mut registry = PlayerRegistry::new();
    for player in players(32) {
        registry.register(player);
    }

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let id = ((i % 32) + 1).to_string();
        assert!(registry.update_position(&id, Vec3::new(i as f32, 0.0, 0.0)));
    }

    let duration = start.elapsed();
    println!(
        "Registry updates: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks UDP frame serialization with an envelope payload
#[test]
fn benchmark_frame_serialization() {
    let payload = encode(&Envelope::ServerUpdate {
        players: players(32),
    })
    .unwrap();
    let frame = Frame::Data(payload);

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = frame.to_bytes().unwrap();
        let back = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(back, frame);
    }

    let duration = start.elapsed();
    println!(
        "Frame serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks authority cycles with a full set of connections
#[test]
fn benchmark_authority_cycle() {
    let hub = MemoryHub::new();
    let broadcast = Duration::from_millis(300);
    let mut authority = Authority::new(hub.server(), broadcast);
    let mut clients: Vec<_> = (0..32).map(|_| hub.connect()).collect();

    let mut now = Instant::now();
    authority.update(now);

    let cycles = 1_000;
    let start = Instant::now();

    for cycle in 0..cycles {
        now += broadcast;
        for (i, client) in clients.iter_mut().enumerate() {
            while client.pop_event().is_some() {}
            let player = PlayerState::new(
                (i + 1).to_string(),
                Rgb::new(1.0, 0.0, 0.0),
                Vec3::new(cycle as f32, 0.0, 0.0),
            );
            let envelope = if cycle == 0 {
                Envelope::Handshake { player }
            } else {
                Envelope::PlayerUpdate { player }
            };
            client.send(&encode(&envelope).unwrap()).unwrap();
        }
        authority.update(now);
    }

    let duration = start.elapsed();
    println!(
        "Authority cycle (32 peers, broadcast every cycle): {} cycles in {:?} ({:.2} μs/cycle)",
        cycles,
        duration,
        duration.as_micros() as f64 / cycles as f64
    );

    assert_eq!(authority.registry().len(), 32);
    assert!(duration.as_millis() < 10_000);
}
