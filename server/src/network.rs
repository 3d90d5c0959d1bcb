//! Server network layer accepting WebSocket peers

use crate::connection::{handle_connection, SharedRegistry};
use crate::registry::{ConnectionId, Registry};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::time::sleep;

/// Pause after a failed `accept`, so a persistent error like running out of
/// file descriptors does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Listening endpoint owning the one registry shared by every connection
pub struct Server {
    listener: TcpListener,
    registry: SharedRegistry,
    next_connection_id: ConnectionId,
}

impl Server {
    pub async fn bind(addr: &str) -> ServerResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("WebSocket server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            registry: Arc::new(RwLock::new(Registry::new())),
            next_connection_id: 1,
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> SharedRegistry {
        Arc::clone(&self.registry)
    }

    /// Accepts peers forever, serving each on its own task. Failed accepts and
    /// failed handshakes are logged and never stop the loop.
    pub async fn run(mut self) -> ServerResult<()> {
        info!("Server started successfully");

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                warn!("Could not disable Nagle for {}: {}", addr, e);
            }

            let connection_id = self.next_connection_id;
            self.next_connection_id += 1;

            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, connection_id, registry).await {
                    error!("Connection {} from {} failed: {}", connection_id, addr, e);
                }
            });
        }
    }
}
