use crate::mirror::Mirror;
use crate::network::ConnectionStatus;
use macroquad::prelude::*;
use shared::{PlayerSnapshot, CANVAS_SIZE, CELL_SIZE, GRID_SIZE};

pub const STATUS_BAR_HEIGHT: f32 = 40.0;

const GRID_LINE: Color = Color::new(0.87, 0.87, 0.87, 1.0);
const INK: Color = Color::new(0.2, 0.2, 0.2, 1.0);

/// Pixel centre of a grid cell.
pub fn cell_center(x: i32, y: i32) -> (f32, f32) {
    (
        x as f32 * CELL_SIZE + CELL_SIZE / 2.0,
        y as f32 * CELL_SIZE + CELL_SIZE / 2.0,
    )
}

/// Parses a `#RRGGBB` palette entry.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(Color::from_hex)
}

pub fn status_text(status: ConnectionStatus, mirror: &Mirror) -> String {
    match status {
        ConnectionStatus::Connecting => "Connecting...".to_string(),
        ConnectionStatus::Closed => "Disconnected - press R to reconnect".to_string(),
        ConnectionStatus::Open => match mirror.self_id() {
            Some(id) => format!(
                "Playing as {} (ID: {}) - {} online - arrows/WASD to move",
                mirror.join_name(),
                id,
                mirror.len()
            ),
            None => format!("Joining as {}...", mirror.join_name()),
        },
    }
}

/// Draws the mirror; never mutates it.
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    pub fn render(&self, mirror: &Mirror, status: ConnectionStatus) {
        clear_background(WHITE);

        self.draw_grid();

        for player in mirror.players() {
            let is_me = Some(player.id) == mirror.self_id();
            self.draw_player(player, is_me);
        }

        draw_text(
            &status_text(status, mirror),
            10.0,
            CANVAS_SIZE + STATUS_BAR_HEIGHT / 2.0 + 5.0,
            20.0,
            INK,
        );
    }

    fn draw_grid(&self) {
        for i in 0..=GRID_SIZE {
            let offset = i as f32 * CELL_SIZE;
            draw_line(offset, 0.0, offset, CANVAS_SIZE, 1.0, GRID_LINE);
            draw_line(0.0, offset, CANVAS_SIZE, offset, 1.0, GRID_LINE);
        }
    }

    fn draw_player(&self, player: &PlayerSnapshot, is_me: bool) {
        let (cx, cy) = cell_center(player.x, player.y);
        let radius = CELL_SIZE / 3.0;
        let color = parse_hex_color(&player.color).unwrap_or(GRAY);

        draw_circle(cx, cy, radius, color);
        if is_me {
            draw_circle_lines(cx, cy, radius, 3.0, INK);
        }

        let font_size = 12.0;
        let dims = measure_text(&player.name, None, font_size as u16, 1.0);
        draw_text(
            &player.name,
            cx - dims.width / 2.0,
            player.y as f32 * CELL_SIZE + CELL_SIZE + dims.offset_y,
            font_size,
            INK,
        );
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{Message, COLORS};

    #[test]
    fn test_cell_center() {
        let (x, y) = cell_center(0, 0);
        assert_approx_eq!(x, 15.0);
        assert_approx_eq!(y, 15.0);

        let (x, y) = cell_center(GRID_SIZE - 1, 2);
        assert_approx_eq!(x, CANVAS_SIZE - CELL_SIZE / 2.0);
        assert_approx_eq!(y, 75.0);
    }

    #[test]
    fn test_parse_palette_colors() {
        for hex in COLORS {
            assert!(parse_hex_color(hex).is_some(), "{}", hex);
        }

        let color = parse_hex_color("#FF0000").unwrap();
        assert_approx_eq!(color.r, 1.0);
        assert_approx_eq!(color.g, 0.0);
        assert_approx_eq!(color.b, 0.0);
    }

    #[test]
    fn test_parse_invalid_colors() {
        for hex in ["", "FF0000", "#FFF", "#GGGGGG", "#FF00000"] {
            assert!(parse_hex_color(hex).is_none(), "{}", hex);
        }
    }

    #[test]
    fn test_status_text() {
        let mut mirror = Mirror::new("Alice");
        assert_eq!(status_text(ConnectionStatus::Connecting, &mirror), "Connecting...");
        assert_eq!(
            status_text(ConnectionStatus::Open, &mirror),
            "Joining as Alice..."
        );

        mirror.apply(&Message::PlayerJoined {
            player: PlayerSnapshot {
                id: 3,
                name: "Alice".to_string(),
                x: 1,
                y: 1,
                color: COLORS[2].to_string(),
            },
        });
        assert!(status_text(ConnectionStatus::Open, &mirror).starts_with("Playing as Alice (ID: 3)"));
        assert!(status_text(ConnectionStatus::Closed, &mirror).contains("reconnect"));
    }
}
