//! # Player Sync Client
//!
//! The peer side of the player-sync protocol. A peer connects, waits for
//! the server to assign its player id, answers with a handshake and then
//! reports its position on a fixed interval while mirroring every other
//! player from the server's full-state broadcasts.
//!
//! ## Module Organization
//!
//! - `session`: the protocol state machine, generic over the transport, the
//!   renderer ([`session::EntityRenderer`]) and the position source
//!   ([`session::LocalInput`]).
//! - `transport`: the UDP client transport with connect retries and an
//!   inactivity timeout.
//! - `rendering` and `input`: the macroquad cube scene and keyboard movement.
//! - `network`: the windowed frame loop tying them together.
//! - `config`: runtime settings.

pub mod config;
pub mod input;
pub mod network;
pub mod rendering;
pub mod session;
pub mod transport;
