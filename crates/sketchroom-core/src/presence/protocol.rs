//! Presence wire protocol.
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join", "room": "42", "user_id": "auth0|abc" }
//! { "type": "log_join_user", "user_id": "auth0|def" }
//! { "type": "disconnect_user", "user_id": "auth0|abc" }
//! { "type": "user_joined", "user_id": "auth0|def" }
//! ```

use super::PresenceError;
use serde::{Deserialize, Serialize};

/// Messages sent to the presence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter a room. `user_id` is absent when identity has not loaded yet.
    Join {
        room: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Acknowledge a `user_joined` notification.
    LogJoinUser { user_id: String },
    /// Announce departure before the connection closes.
    DisconnectUser {
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Leave the current room but keep the connection.
    Leave,
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, PresenceError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Messages received from the presence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join confirmed.
    Joined { room_id: String, participants: usize },
    /// The joiner was the first participant, so the room was created.
    RoomCreated { user_id: String, room_id: String },
    /// Another participant entered the room.
    UserJoined { user_id: String },
    /// A participant left the room.
    UserLeft { user_id: String },
    /// Error message
    Error { message: String },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, PresenceError> {
        Ok(serde_json::to_string(self)?)
    }
}
