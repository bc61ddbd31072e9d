//! # Flying Aces Server Library
//!
//! Authoritative server for up to four players. The server owns the only
//! copy of the world, advances it at a fixed 30 Hz and sends the complete
//! state to every connected client each tick. Clients never simulate; they
//! send inputs and draw whatever the latest snapshot says.
//!
//! ## Tick
//!
//! Each tick drains every datagram that arrived since the previous one,
//! steps the simulation by a fixed delta, resolves collisions, broadcasts
//! the snapshot, evicts sessions that have gone silent and then sleeps until
//! the next tick boundary.
//!
//! ## Modules
//!
//! - `client_manager`: slot registry binding transport addresses to players
//! - `game`: simulation step (movement, weapons, enemies, projectiles)
//! - `collision`: fixed-order collision resolution with damage and scoring
//! - `lifecycle`: death and respawn transitions
//! - `game_server`: socket-free context owning all of the above
//! - `network`: UDP tasks and the tick loop
//! - `config`: runtime settings

pub mod client_manager;
pub mod collision;
pub mod config;
pub mod game;
pub mod game_server;
pub mod lifecycle;
pub mod network;

pub use config::ServerConfig;
pub use game_server::{GameMessage, GameServer};
pub use network::Server;
