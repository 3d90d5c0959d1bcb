//! Keyboard handling for the grid client

use macroquad::prelude::*;
use shared::Direction;

const STEER_KEYS: [KeyCode; 8] = [
    KeyCode::Up,
    KeyCode::Down,
    KeyCode::Left,
    KeyCode::Right,
    KeyCode::W,
    KeyCode::S,
    KeyCode::A,
    KeyCode::D,
];

/// What the player asked for this frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// One entry per steering key pressed this frame.
    pub directions: Vec<Direction>,
    pub reconnect: bool,
}

/// Arrow keys and WASD both steer.
pub fn direction_for_key(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::Up | KeyCode::W => Some(Direction::Up),
        KeyCode::Down | KeyCode::S => Some(Direction::Down),
        KeyCode::Left | KeyCode::A => Some(Direction::Left),
        KeyCode::Right | KeyCode::D => Some(Direction::Right),
        _ => None,
    }
}

/// Every steering key `pressed` reports, each as its own step. Keys pressed
/// within the same frame come out in arrows-then-WASD order.
pub fn pressed_directions(pressed: impl Fn(KeyCode) -> bool) -> Vec<Direction> {
    STEER_KEYS
        .iter()
        .copied()
        .filter(|key| pressed(*key))
        .filter_map(direction_for_key)
        .collect()
}

/// Samples key presses since the last frame. One press is one step; holding
/// a key does not repeat.
pub fn poll_input() -> FrameInput {
    FrameInput {
        directions: pressed_directions(is_key_pressed),
        reconnect: is_key_pressed(KeyCode::R),
    }
}
