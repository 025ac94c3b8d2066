//! # Player Sync Server
//!
//! The authority side of the player-sync protocol. It hands every new
//! connection a player id, keeps the canonical list of players, and
//! broadcasts that list to every live connection on a fixed interval.
//! Disconnects are propagated to the remaining peers as they happen.
//!
//! ## Module Organization
//!
//! - `authority`: connection slots, message dispatch and the broadcast
//!   cycle, generic over any [`shared::ServerTransport`].
//! - `registry`: the canonical player list in join order.
//! - `client_manager` and `transport`: the UDP connection table and the
//!   transport built on it.
//! - `network`: the tokio loop that runs the authority until shutdown.
//! - `config`: runtime settings.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::bind(&ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod authority;
pub mod client_manager;
pub mod config;
pub mod network;
pub mod registry;
pub mod transport;
