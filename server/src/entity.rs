use rand::Rng;
use shared::{Direction, PlayerSnapshot, COLORS, GRID_SIZE};

/// A participant occupying one cell of the grid.
///
/// Owned exclusively by the [`Registry`](crate::registry::Registry); everything
/// else refers to it by `id` and only ever sees [`PlayerSnapshot`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: u32,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub color: &'static str,
}

impl Participant {
    /// Spawns at a uniformly random cell with a uniformly random palette colour.
    pub fn new(id: u32, name: String) -> Self {
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(0..GRID_SIZE);
        let y = rng.gen_range(0..GRID_SIZE);
        let color = COLORS[rng.gen_range(0..COLORS.len())];

        Self::with_position(id, name, x, y, color)
    }

    pub fn with_position(id: u32, name: String, x: i32, y: i32, color: &'static str) -> Self {
        Participant {
            id,
            name,
            x,
            y,
            color,
        }
    }

    /// Moves one cell. A step that would leave the grid is rejected rather than
    /// clamped; returns whether the position changed.
    pub fn move_in(&mut self, direction: Direction) -> bool {
        let (dx, dy) = direction.delta();
        let new_x = self.x + dx;
        let new_y = self.y + dy;

        if !in_bounds(new_x) || !in_bounds(new_y) {
            return false;
        }

        self.x = new_x;
        self.y = new_y;
        true
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn to_snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            x: self.x,
            y: self.y,
            color: self.color.to_string(),
        }
    }
}

fn in_bounds(coordinate: i32) -> bool {
    (0..GRID_SIZE).contains(&coordinate)
}
