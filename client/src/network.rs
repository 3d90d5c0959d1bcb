//! Client connection to the grid server
//!
//! The render loop is synchronous, so the WebSocket lives on its own thread
//! with a small tokio runtime. The two sides talk through unbounded channels:
//! outbound [`Message`]s go in, [`NetworkEvent`]s come back out and are
//! drained once per frame by [`Client::update`].
//!
//! Closing is a handshake: [`Connection::close`] returns only once the
//! server has dropped the socket, which it does after removing our
//! participant.

use crate::mirror::Mirror;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{Direction, Message};
use std::mem;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// How long a closing connection waits for the server to hang up.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    Connected,
    Message(Message),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
}

/// One WebSocket session with the server
///
/// Sends `join` as soon as the socket opens. Dropping the connection closes
/// the outbound channel, which ends the background thread without waiting
/// for it; use [`Connection::close`] to wait.
pub struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedReceiver<NetworkEvent>,
    status: ConnectionStatus,
    thread: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn open(url: &str, name: &str) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();

        let url = url.to_string();
        let join = Message::join(name);
        let spawned = thread::Builder::new()
            .name("network".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to start network runtime: {}", e);
                        let _ = events_tx.send(NetworkEvent::Closed);
                        return;
                    }
                };

                runtime.block_on(run_connection(url, join, outbound_rx, events_tx.clone()));
                let _ = events_tx.send(NetworkEvent::Closed);
            });

        let (status, thread) = match spawned {
            Ok(thread) => (ConnectionStatus::Connecting, Some(thread)),
            Err(e) => {
                error!("Failed to spawn network thread: {}", e);
                (ConnectionStatus::Closed, None)
            }
        };

        Connection {
            outbound,
            events,
            status,
            thread,
        }
    }

    /// Closes the socket and blocks until the network thread has finished.
    ///
    /// An open connection sends a close frame and waits, at most
    /// [`CLOSE_TIMEOUT`], for the server to hang up. A connection still
    /// handshaking is abandoned before it ever joins. Events not yet polled
    /// are discarded.
    pub fn close(&mut self) {
        let (closed, _) = mpsc::unbounded_channel();
        drop(mem::replace(&mut self.outbound, closed));

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Network thread panicked");
            }
        }

        while self.events.try_recv().is_ok() {}
        self.status = ConnectionStatus::Closed;
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == ConnectionStatus::Open
    }

    /// Queues a message. Returns false once the connection is gone.
    pub fn send(&self, message: Message) -> bool {
        self.is_open() && self.outbound.send(message).is_ok()
    }

    /// Drains every event received since the last poll, in arrival order.
    pub fn poll(&mut self) -> Vec<NetworkEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    match event {
                        NetworkEvent::Connected => self.status = ConnectionStatus::Open,
                        NetworkEvent::Closed => self.status = ConnectionStatus::Closed,
                        NetworkEvent::Message(_) => {}
                    }
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.status != ConnectionStatus::Closed {
                        self.status = ConnectionStatus::Closed;
                        events.push(NetworkEvent::Closed);
                    }
                    break;
                }
            }
        }
        events
    }
}

async fn run_connection(
    url: String,
    join: Message,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    events: mpsc::UnboundedSender<NetworkEvent>,
) {
    info!("Connecting to {}", url);
    let connected = tokio::select! {
        connected = connect_async(url.as_str()) => connected,
        _ = outbound.recv() => {
            debug!("Connection to {} abandoned before it opened", url);
            return;
        }
    };
    let (ws_stream, _) = match connected {
        Ok(connected) => connected,
        Err(e) => {
            error!("Failed to connect to {}: {}", url, e);
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    if events.send(NetworkEvent::Connected).is_err() {
        return;
    }

    let mut pending = Some(join);
    loop {
        if let Some(message) = pending.take() {
            match message.encode() {
                Ok(frame) => {
                    if let Err(e) = ws_sender.send(WsMessage::Text(frame.into())).await {
                        warn!("Failed to send {}: {}", message.kind(), e);
                        break;
                    }
                }
                Err(e) => warn!("Not sending {}: {}", message.kind(), e),
            }
        }

        tokio::select! {
            frame = ws_receiver.next() => {
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                };

                match Message::decode(text.as_str()) {
                    Ok(message) => {
                        if events.send(NetworkEvent::Message(message)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping frame from server: {}", e),
                }
            }

            message = outbound.recv() => match message {
                Some(message) => pending = Some(message),
                None => {
                    debug!("Closing connection to {}", url);
                    let _ = ws_sender.close().await;

                    // The server hangs up only after it has removed us.
                    let hung_up = timeout(CLOSE_TIMEOUT, async {
                        while let Some(Ok(_)) = ws_receiver.next().await {}
                    })
                    .await;
                    if hung_up.is_err() {
                        warn!("{} did not hang up within {:?}", url, CLOSE_TIMEOUT);
                    }
                    break;
                }
            },
        }
    }
}

/// A player's session: the live connection plus the mirror it feeds.
pub struct Client {
    server_url: String,
    name: String,
    connection: Connection,
    mirror: Mirror,
}

impl Client {
    pub fn connect(server_url: &str, name: &str) -> Self {
        Client {
            server_url: server_url.to_string(),
            name: name.to_string(),
            connection: Connection::open(server_url, name),
            mirror: Mirror::new(name),
        }
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Applies everything the server sent since the last call. Returns true
    /// if the mirror may have changed.
    pub fn update(&mut self) -> bool {
        let events = self.connection.poll();
        let changed = !events.is_empty();

        for event in events {
            match event {
                NetworkEvent::Connected => info!("Connected to {}", self.server_url),
                NetworkEvent::Message(message) => self.mirror.apply(&message),
                NetworkEvent::Closed => {
                    info!("Disconnected from {}", self.server_url);
                    self.mirror.reset();
                }
            }
        }

        changed
    }

    /// Asks the server to move us. Nothing is sent until the connection is
    /// open and we know our own id; the mirror only changes on the echo.
    pub fn request_move(&self, direction: Direction) -> bool {
        if !self.connection.is_open() {
            return false;
        }

        match self.mirror.move_request(direction) {
            Some(message) => self.connection.send(message),
            None => false,
        }
    }

    /// Closes the current connection and starts over with an empty mirror.
    ///
    /// The old session is fully closed first, so the new `gameState` never
    /// lists our previous participant under the same name.
    pub fn reconnect(&mut self) {
        info!("Reconnecting to {}", self.server_url);
        self.connection.close();
        self.connection = Connection::open(&self.server_url, &self.name);
        self.mirror = Mirror::new(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for_close(connection: &mut Connection) -> Vec<NetworkEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while Instant::now() < deadline {
            events.extend(connection.poll());
            if connection.status() == ConnectionStatus::Closed {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        events
    }

    #[test]
    fn test_unreachable_server_closes() {
        let mut connection = Connection::open("ws://127.0.0.1:1", "Alice");
        assert!(!connection.is_open());

        let events = wait_for_close(&mut connection);

        assert_eq!(connection.status(), ConnectionStatus::Closed);
        assert_eq!(events.last(), Some(&NetworkEvent::Closed));
        assert!(!events.contains(&NetworkEvent::Connected));
    }

    #[test]
    fn test_invalid_url_closes() {
        let mut connection = Connection::open("not a url", "Alice");
        wait_for_close(&mut connection);
        assert_eq!(connection.status(), ConnectionStatus::Closed);
    }

    #[test]
    fn test_send_before_open_is_refused() {
        let connection = Connection::open("ws://127.0.0.1:1", "Alice");
        assert!(!connection.send(Message::move_to(Direction::Up)));
    }

    #[test]
    fn test_close_waits_for_network_thread() {
        let mut connection = Connection::open("ws://127.0.0.1:1", "Alice");
        connection.close();

        assert_eq!(connection.status(), ConnectionStatus::Closed);
        assert!(connection.thread.is_none());
        assert!(connection.poll().is_empty());
        assert!(!connection.send(Message::move_to(Direction::Up)));
    }

    #[test]
    fn test_close_twice() {
        let mut connection = Connection::open("ws://127.0.0.1:1", "Alice");
        connection.close();
        connection.close();
        assert_eq!(connection.status(), ConnectionStatus::Closed);
    }

    #[test]
    fn test_client_without_server() {
        let mut client = Client::connect("ws://127.0.0.1:1", "Alice");
        assert!(!client.request_move(Direction::Down));

        let deadline = Instant::now() + Duration::from_secs(5);
        while client.status() != ConnectionStatus::Closed && Instant::now() < deadline {
            client.update();
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(client.status(), ConnectionStatus::Closed);
        assert!(client.mirror().is_empty());
        assert_eq!(client.mirror().self_id(), None);
    }
}
