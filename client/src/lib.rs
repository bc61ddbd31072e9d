//! # Flying Aces Client Library
//!
//! The protocol-facing half of a game client. The server is authoritative
//! and the client does no simulation of its own: each frame it sends one
//! input packet, drains whatever snapshots have arrived and keeps only the
//! newest one for presentation.
//!
//! ## Modules
//!
//! - `network`: [`NetworkClient`](network::NetworkClient) handshake, input
//!   upload, snapshot intake and liveness tracking
//! - `input`: scripted input used by the headless binary
//! - `error`: typed errors for the connect path
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::input::InputManager;
//! use client::network::{ClientConfig, NetworkClient};
//!
//! # async fn run() -> Result<(), client::error::ClientError> {
//! let mut network = NetworkClient::new("127.0.0.1:9999", ClientConfig::default()).await?;
//! network.connect("Maverick").await?;
//!
//! let mut input = InputManager::new(true);
//! while network.is_connected() {
//!     network.send_input(&input.update()).await?;
//!     network.receive_state().await;
//!     // draw network.state() here
//!     tokio::time::sleep(std::time::Duration::from_millis(33)).await;
//! }
//! network.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod input;
pub mod network;

pub use error::{ClientError, ClientResult};
pub use network::{ClientConfig, NetworkClient};
