//! # Grid Server Library
//!
//! Authoritative server for a shared 20x20 grid. Peers connect over
//! WebSocket, join with a display name, and move one cell at a time; every
//! change is pushed to all connected peers as JSON messages from
//! [`shared::Message`].
//!
//! ## Data flow
//!
//! 1. A peer connects and sends `join`.
//! 2. The [`registry::Registry`] creates a participant at a random cell.
//! 3. The joining peer receives a full `gameState`, then everyone receives
//!    `playerJoined`.
//! 4. Each `move` that actually changes a position is broadcast as
//!    `playerMoved`; moves into a wall produce no traffic.
//! 5. When the connection closes the participant is removed and the others
//!    receive `playerLeft`.
//!
//! ## Module Organization
//!
//! ### Entity Module (`entity`)
//! The participant record and its movement rule.
//!
//! ### Registry Module (`registry`)
//! Identity allocation, participant storage keyed by id, and fan-out to
//! connection handles that are still open.
//!
//! ### Connection Module (`connection`)
//! The per-connection `Unjoined -> Joined -> Closed` state machine and the
//! async task that drives it over a WebSocket.
//!
//! ### Network Module (`network`)
//! The TCP listener and accept loop.
//!
//! ## Concurrency
//!
//! There is a single registry per process, shared behind an async
//! `RwLock`. Each connection runs on its own task and handles its frames
//! strictly in order; a frame's mutation and the broadcasts it triggers
//! happen under one write lock, so every peer observes broadcasts in the same
//! order.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::bind("127.0.0.1:3000").await?;
//!     server.run().await
//! }
//! ```

pub mod connection;
pub mod entity;
pub mod network;
pub mod registry;
