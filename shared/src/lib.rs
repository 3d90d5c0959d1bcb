//! Wire protocol and constants shared by the grid server and its clients.
//!
//! Every frame on the connection is one JSON object whose `type` field selects
//! one of the [`Message`] variants. Grid size and palette are fixed constants
//! here and never negotiated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const GRID_SIZE: i32 = 20;
pub const CELL_SIZE: f32 = 30.0;
pub const CANVAS_SIZE: f32 = GRID_SIZE as f32 * CELL_SIZE;
pub const DEFAULT_PORT: u16 = 3000;

/// Name given to participants that join with a blank name.
pub const ANONYMOUS: &str = "Anonymous";

pub const COLORS: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#48DBFB", "#FF9FF3", "#54A0FF",
    "#FD79A8", "#A29BFE",
];

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Grid offset of one step; `y` grows downwards.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(ProtocolError::UnknownDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public view of a participant, the only form that crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: u32,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    // Peer -> server
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Move {
        direction: String,
    },

    // Server -> peer
    #[serde(rename_all = "camelCase")]
    GameState {
        players: Vec<PlayerSnapshot>,
        grid_size: i32,
    },
    PlayerJoined {
        player: PlayerSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    PlayerMoved {
        player_id: u32,
        x: i32,
        y: i32,
    },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: u32,
    },
}

impl Message {
    pub fn join(name: &str) -> Self {
        Message::Join {
            name: Some(name.to_string()),
        }
    }

    pub fn move_to(direction: Direction) -> Self {
        Message::Move {
            direction: direction.as_str().to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Join { .. } => "join",
            Message::Move { .. } => "move",
            Message::GameState { .. } => "gameState",
            Message::PlayerJoined { .. } => "playerJoined",
            Message::PlayerMoved { .. } => "playerMoved",
            Message::PlayerLeft { .. } => "playerLeft",
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}

/// Blank or whitespace-only names become [`ANONYMOUS`]; anything else is kept verbatim.
pub fn normalize_name(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => ANONYMOUS.to_string(),
    }
}
