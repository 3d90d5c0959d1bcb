//! Authoritative participant registry for the shared grid
//!
//! The registry owns every live [`Participant`] together with the handle of
//! the connection that created it. It hands out identities, applies movement,
//! and fans protocol messages out to connected peers. Lookups for unknown
//! identities resolve to `None`/`false` instead of failing.

use crate::connection::ConnectionError;
use crate::entity::Participant;
use log::{debug, info, warn};
use shared::{normalize_name, Direction, Message, PlayerSnapshot};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub type ConnectionId = u64;

/// Write side of one peer's connection
///
/// Frames pushed through the handle are queued on an unbounded channel that
/// the connection's writer task drains in order, so each peer sees messages
/// in the order they were sent. The open flag is cleared once the connection
/// starts tearing down.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    connection_id: ConnectionId,
    sender: mpsc::UnboundedSender<String>,
    open: Arc<AtomicBool>,
}

impl PeerHandle {
    pub fn new(connection_id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = PeerHandle {
            connection_id,
            sender,
            open: Arc::new(AtomicBool::new(true)),
        };
        (handle, receiver)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }

    pub fn send(&self, frame: String) -> Result<(), ConnectionError> {
        self.sender
            .send(frame)
            .map_err(|_| ConnectionError::PeerGone(self.connection_id))
    }
}

#[derive(Debug)]
struct Entry {
    participant: Participant,
    handle: PeerHandle,
}

/// Live participants keyed by identity
///
/// Identities start at 1 and only ever grow, so the ordered map enumerates
/// entries in insertion order. A secondary index maps connection ids back to
/// identities and is kept in lockstep with the primary map.
#[derive(Debug)]
pub struct Registry {
    entries: BTreeMap<u32, Entry>,
    by_connection: HashMap<ConnectionId, u32>,
    next_id: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_connection: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a new participant owned by `handle` and returns its snapshot.
    ///
    /// Blank names are stored as "Anonymous". Never fails, and identities are
    /// not reused even after the participant is removed.
    pub fn add_participant(&mut self, name: &str, handle: PeerHandle) -> PlayerSnapshot {
        let id = self.next_id;
        self.next_id += 1;

        let participant = Participant::new(id, normalize_name(Some(name)));
        let snapshot = participant.to_snapshot();

        if let Some(previous) = self.by_connection.insert(handle.connection_id(), id) {
            warn!(
                "Connection {} already owned player {}, rebinding to {}",
                handle.connection_id(),
                previous,
                id
            );
        }
        self.entries.insert(
            id,
            Entry {
                participant,
                handle,
            },
        );

        snapshot
    }

    /// Removes a participant. Returns false if it was already gone.
    pub fn remove_participant(&mut self, id: u32) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.by_connection.remove(&entry.handle.connection_id());
                info!("Removed player {} ({})", id, entry.participant.name);
                true
            }
            None => false,
        }
    }

    pub fn get_participant(&self, id: u32) -> Option<&Participant> {
        self.entries.get(&id).map(|entry| &entry.participant)
    }

    pub fn get_participant_mut(&mut self, id: u32) -> Option<&mut Participant> {
        self.entries.get_mut(&id).map(|entry| &mut entry.participant)
    }

    /// Applies one step of movement. Unknown identities and unrecognised
    /// directions are no-ops returning false.
    pub fn move_participant(&mut self, id: u32, direction: &str) -> bool {
        let direction = match direction.parse::<Direction>() {
            Ok(direction) => direction,
            Err(e) => {
                debug!("Player {} sent unusable move: {}", id, e);
                return false;
            }
        };

        match self.get_participant_mut(id) {
            Some(participant) => participant.move_in(direction),
            None => false,
        }
    }

    /// Snapshots of every participant in enumeration order.
    ///
    /// Positions in the returned list are not stable across removals; match
    /// on `id`.
    pub fn all_snapshots(&self) -> Vec<PlayerSnapshot> {
        self.entries
            .values()
            .map(|entry| entry.participant.to_snapshot())
            .collect()
    }

    /// Sends to a single participant if its connection is open.
    ///
    /// Unknown identities and closed handles are silently skipped. An error
    /// means the handle claimed to be open but its connection is gone.
    pub fn send_to(&self, id: u32, message: &Message) -> Result<(), ConnectionError> {
        let Some(entry) = self.entries.get(&id) else {
            debug!("Dropping {} for unknown player {}", message.kind(), id);
            return Ok(());
        };

        if !entry.handle.is_open() {
            debug!("Dropping {} for closed player {}", message.kind(), id);
            return Ok(());
        }

        entry.handle.send(message.encode()?)
    }

    /// Sends to every open connection. Returns how many peers it reached.
    pub fn broadcast_all(&self, message: &Message) -> usize {
        self.broadcast(message, None)
    }

    /// Sends to every open connection except `exclude_id`'s.
    pub fn broadcast_except(&self, message: &Message, exclude_id: u32) -> usize {
        self.broadcast(message, Some(exclude_id))
    }

    fn broadcast(&self, message: &Message, exclude: Option<u32>) -> usize {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Not broadcasting {}: {}", message.kind(), e);
                return 0;
            }
        };

        // Recipients are fixed before the first send
        let recipients: Vec<(u32, PeerHandle)> = self
            .entries
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(id, entry)| (*id, entry.handle.clone()))
            .collect();

        let mut delivered = 0;
        for (id, handle) in recipients {
            if !handle.is_open() {
                continue;
            }

            match handle.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to send {} to player {}: {}", message.kind(), id, e),
            }
        }

        delivered
    }

    /// Resolves which participant, if any, a connection owns.
    pub fn identity_for_handle(&self, handle: &PeerHandle) -> Option<u32> {
        self.by_connection.get(&handle.connection_id()).copied()
    }

    /// Returns the number of live participants
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nobody is on the grid
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
