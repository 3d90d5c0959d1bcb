//! Peer-local copy of the server's participant registry

use log::debug;
use shared::{normalize_name, Direction, Message, PlayerSnapshot};
use std::collections::BTreeMap;

/// Last known snapshot of every participant, plus which one is us.
///
/// Only ever changed by applying server messages in arrival order; local
/// input never touches it directly. A new connection always starts from a
/// fresh mirror.
#[derive(Debug, Clone)]
pub struct Mirror {
    players: BTreeMap<u32, PlayerSnapshot>,
    self_id: Option<u32>,
    join_name: String,
}

impl Mirror {
    /// `join_name` is the name submitted in our `join`, normalised the same
    /// way the server does it.
    pub fn new(join_name: &str) -> Self {
        Self {
            players: BTreeMap::new(),
            self_id: None,
            join_name: normalize_name(Some(join_name)),
        }
    }

    pub fn join_name(&self) -> &str {
        &self.join_name
    }

    pub fn self_id(&self) -> Option<u32> {
        self.self_id
    }

    pub fn get(&self, id: u32) -> Option<&PlayerSnapshot> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Folds one server message into the mirror.
    pub fn apply(&mut self, message: &Message) {
        match message {
            Message::GameState { players, .. } => {
                self.players.clear();
                for player in players {
                    self.players.insert(player.id, player.clone());
                }

                if self.self_id.is_none() {
                    self.self_id = players
                        .iter()
                        .find(|player| player.name == self.join_name)
                        .map(|player| player.id);
                }
            }

            Message::PlayerJoined { player } => {
                self.players.insert(player.id, player.clone());
                if self.self_id.is_none() && player.name == self.join_name {
                    self.self_id = Some(player.id);
                }
            }

            Message::PlayerMoved { player_id, x, y } => {
                if let Some(player) = self.players.get_mut(player_id) {
                    player.x = *x;
                    player.y = *y;
                }
            }

            // self_id survives our own removal until the connection closes
            Message::PlayerLeft { player_id } => {
                self.players.remove(player_id);
            }

            Message::Join { .. } | Message::Move { .. } => {
                debug!("Ignoring client-bound {} message", message.kind());
            }
        }
    }

    /// Builds the `move` to send for a key press, once we know who we are.
    pub fn move_request(&self, direction: Direction) -> Option<Message> {
        self.self_id.map(|_| Message::move_to(direction))
    }

    /// Forgets everything, as when the connection closes.
    pub fn reset(&mut self) {
        self.players.clear();
        self.self_id = None;
    }
}
