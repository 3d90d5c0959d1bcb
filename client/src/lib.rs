//! # Grid Client Library
//!
//! Client side of the shared grid. The client keeps a local mirror of the
//! server's participants, feeds it with the messages the server broadcasts,
//! and draws it every frame.
//!
//! ## Architecture Overview
//!
//! The server is the only authority. The client never predicts or
//! interpolates: a key press sends a `move` request and the participant only
//! moves once the server's `playerMoved` echo is applied to the mirror.
//!
//! ## Module Organization
//!
//! ### Mirror Module (`mirror`)
//! The identity to snapshot map and the rules for folding `gameState`,
//! `playerJoined`, `playerMoved` and `playerLeft` into it. It also works out
//! which participant is us by matching the name we joined with.
//!
//! ### Network Module (`network`)
//! The WebSocket connection, run on a background thread, and the `Client`
//! session that ties a connection to its mirror. Reconnecting always starts
//! from an empty mirror.
//!
//! ### Input Module (`input`)
//! Arrow key and WASD mapping to grid directions.
//!
//! ### Rendering Module (`rendering`)
//! Draws the grid and every participant; a read-only consumer of the mirror.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::Direction;
//!
//! let mut client = Client::connect("ws://127.0.0.1:3000", "Alice");
//! loop {
//!     client.update();
//!     client.request_move(Direction::Up);
//!     for player in client.mirror().players() {
//!         println!("{} at ({}, {})", player.name, player.x, player.y);
//!     }
//! }
//! ```

pub mod input;
pub mod mirror;
pub mod network;
pub mod rendering;
