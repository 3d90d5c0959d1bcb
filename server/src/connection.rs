//! Per-connection control loop
//!
//! [`Session`] is the transport-free state machine for one peer: it decodes
//! frames, mutates the [`Registry`] and triggers the broadcasts. It moves
//! through `Unjoined -> Joined -> Closed`, and only `join` is honoured before
//! joining and only `move` after.
//!
//! [`handle_connection`] drives a `Session` over an accepted WebSocket.

use crate::registry::{ConnectionId, PeerHandle, Registry};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{Message, ProtocolError, GRID_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};

pub type SharedRegistry = Arc<RwLock<Registry>>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),
    #[error("connection {0} is no longer accepting messages")]
    PeerGone(ConnectionId),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unjoined,
    Joined(u32),
    Closed,
}

pub struct Session {
    handle: PeerHandle,
    state: ConnectionState,
}

impl Session {
    pub fn new(handle: PeerHandle) -> Self {
        Self {
            handle,
            state: ConnectionState::Unjoined,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn owned_id(&self) -> Option<u32> {
        match self.state {
            ConnectionState::Joined(id) => Some(id),
            _ => None,
        }
    }

    /// Handles one inbound text frame.
    ///
    /// Frames that fail to decode are logged and dropped. An error means the
    /// connection can no longer be written to and should be closed.
    pub fn handle_frame(
        &mut self,
        registry: &mut Registry,
        frame: &str,
    ) -> Result<(), ConnectionError> {
        match Message::decode(frame) {
            Ok(message) => self.handle_message(registry, message),
            Err(e) => {
                warn!(
                    "Dropping frame from connection {}: {}",
                    self.handle.connection_id(),
                    e
                );
                Ok(())
            }
        }
    }

    pub fn handle_message(
        &mut self,
        registry: &mut Registry,
        message: Message,
    ) -> Result<(), ConnectionError> {
        match message {
            Message::Join { name } => match self.state {
                ConnectionState::Unjoined => self.join(registry, name.as_deref().unwrap_or("")),
                ConnectionState::Joined(id) => {
                    debug!("Ignoring repeated join from player {}", id);
                    Ok(())
                }
                ConnectionState::Closed => Ok(()),
            },

            Message::Move { direction } => {
                match self.state {
                    ConnectionState::Joined(id) => Self::move_player(registry, id, &direction),
                    _ => debug!(
                        "Ignoring move from connection {} that has not joined",
                        self.handle.connection_id()
                    ),
                }
                Ok(())
            }

            Message::GameState { .. }
            | Message::PlayerJoined { .. }
            | Message::PlayerMoved { .. }
            | Message::PlayerLeft { .. } => {
                debug!(
                    "Ignoring {} sent by connection {}",
                    message.kind(),
                    self.handle.connection_id()
                );
                Ok(())
            }
        }
    }

    fn join(&mut self, registry: &mut Registry, name: &str) -> Result<(), ConnectionError> {
        let player = registry.add_participant(name, self.handle.clone());
        self.state = ConnectionState::Joined(player.id);

        info!(
            "Player {} (ID: {}) joined at ({}, {})",
            player.name, player.id, player.x, player.y
        );

        registry.send_to(
            player.id,
            &Message::GameState {
                players: registry.all_snapshots(),
                grid_size: GRID_SIZE,
            },
        )?;
        registry.broadcast_all(&Message::PlayerJoined { player });

        Ok(())
    }

    fn move_player(registry: &mut Registry, id: u32, direction: &str) {
        if !registry.move_participant(id, direction) {
            return;
        }

        if let Some(player) = registry.get_participant(id) {
            let (x, y) = player.position();
            debug!("Player {} moved to ({}, {})", id, x, y);
            registry.broadcast_all(&Message::PlayerMoved { player_id: id, x, y });
        }
    }

    /// Moves the session to `Closed`, removing its participant and telling
    /// the remaining peers. Only the first call has any effect; returns
    /// whether this call performed the transition.
    pub fn close(&mut self, registry: &mut Registry) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;
        self.handle.mark_closed();

        if let Some(id) = registry.identity_for_handle(&self.handle) {
            if let Some(player) = registry.get_participant(id) {
                info!("Player {} (ID: {}) disconnected", player.name, id);
            }
            registry.remove_participant(id);
            registry.broadcast_except(&Message::PlayerLeft { player_id: id }, id);
        }

        true
    }
}

/// Serves one accepted TCP stream until the peer goes away.
///
/// Inbound frames are processed one at a time, each under the registry's
/// write lock. Outbound frames are queued on the peer's handle and written by
/// a separate task; a failed write ends the connection the same way a close
/// frame does.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection_id: ConnectionId,
    registry: SharedRegistry,
) -> Result<(), ConnectionError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(ConnectionError::Handshake)?;
    info!("Connection {} established from {}", connection_id, addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (handle, mut outbound) = PeerHandle::new(connection_id);

    let mut writer = {
        let handle = handle.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound.recv().await {
                if let Err(e) = ws_sender.send(WsMessage::Text(frame.into())).await {
                    warn!("Failed to write to connection {}: {}", connection_id, e);
                    break;
                }
            }
            handle.mark_closed();
            let _ = ws_sender.close().await;
        })
    };

    let mut session = Session::new(handle);

    let incoming = async {
        while let Some(frame) = ws_receiver.next().await {
            let text = match frame {
                Ok(WsMessage::Text(text)) => text.as_str().to_owned(),
                Ok(WsMessage::Binary(data)) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Dropping non-UTF-8 frame from connection {}", connection_id);
                        continue;
                    }
                },
                Ok(WsMessage::Close(_)) => {
                    debug!("Connection {} requested close", connection_id);
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
            };

            let mut guard = registry.write().await;
            if let Err(e) = session.handle_frame(&mut guard, &text) {
                warn!("Closing connection {}: {}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming => {},
        _ = &mut writer => {
            debug!("Writer for connection {} stopped", connection_id);
        },
    }

    {
        let mut registry = registry.write().await;
        session.close(&mut registry);
    }
    writer.abort();

    info!("Connection {} from {} closed", connection_id, addr);
    Ok(())
}
