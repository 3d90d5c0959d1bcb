use clap::Parser;
use client::input::poll_input;
use client::network::Client;
use client::rendering::{Renderer, STATUS_BAR_HEIGHT};
use log::info;
use macroquad::prelude::*;
use shared::{CANVAS_SIZE, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value_t = format!("ws://127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Display name; blank joins as "Anonymous"
    #[arg(short = 'n', long, default_value = "")]
    name: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Grid".to_string(),
        window_width: CANVAS_SIZE as i32,
        window_height: (CANVAS_SIZE + STATUS_BAR_HEIGHT) as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    info!("Controls: arrows/WASD to move, R to reconnect");

    let mut client = Client::connect(&args.server, &args.name);
    let renderer = Renderer::new();

    loop {
        client.update();

        let input = poll_input();
        if input.reconnect {
            client.reconnect();
        } else {
            for direction in input.directions {
                client.request_move(direction);
            }
        }

        renderer.render(client.mirror(), client.status());

        next_frame().await;
    }
}
