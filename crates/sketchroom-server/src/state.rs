//! Room registry shared by all connections.

use dashmap::DashMap;
use sketchroom_core::presence::ServerMessage;
use std::collections::HashMap;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// A notification tagged with the connection that caused it.
pub type Envelope = (String, ServerMessage);

/// One artwork room.
struct Room {
    /// Broadcast channel for this room
    tx: broadcast::Sender<Envelope>,
    /// Connection id -> announced user id
    participants: HashMap<String, String>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            participants: HashMap::new(),
        }
    }
}

/// Result of entering a room.
pub struct Joined {
    pub rx: broadcast::Receiver<Envelope>,
    /// The joiner is the first participant.
    pub created: bool,
    pub participants: usize,
}

/// Shared application state
pub struct AppState {
    /// Active rooms
    rooms: DashMap<String, Room>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Add a connection to a room, creating the room if needed.
    pub fn join_room(&self, room_id: &str, conn_id: &str, user_id: &str) -> Joined {
        let mut created = false;
        let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            created = true;
            Room::new()
        });
        room.participants
            .insert(conn_id.to_string(), user_id.to_string());
        Joined {
            rx: room.tx.subscribe(),
            created,
            participants: room.participants.len(),
        }
    }

    /// Remove a connection from a room; empty rooms are dropped.
    ///
    /// Returns the user id the connection had announced.
    pub fn leave_room(&self, room_id: &str, conn_id: &str) -> Option<String> {
        let mut room = self.rooms.get_mut(room_id)?;
        let user_id = room.participants.remove(conn_id);
        if room.participants.is_empty() {
            drop(room);
            self.rooms.remove_if(room_id, |_, r| r.participants.is_empty());
        }
        user_id
    }

    /// Send a notification to every subscriber of a room.
    pub fn broadcast(&self, room_id: &str, from: &str, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(room_id) {
            let _ = room.tx.send((from.to_string(), msg));
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant_count(&self, room_id: &str) -> usize {
        self.rooms
            .get(room_id)
            .map(|r| r.participants.len())
            .unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
