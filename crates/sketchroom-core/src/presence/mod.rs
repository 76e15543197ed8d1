//! Room presence: who is in the collaboration room of an artwork.
//!
//! The channel carries membership notifications only. No stroke or image
//! data is exchanged over it.

mod channel;
mod protocol;
#[cfg(not(target_arch = "wasm32"))]
mod socket;

pub use channel::{PresenceChannel, PresenceEvent, PresenceState, PresenceTransport, TransportEvent};
pub use protocol::{ClientMessage, ServerMessage};

#[cfg(not(target_arch = "wasm32"))]
pub use socket::NativeWebSocket;

use thiserror::Error;

/// Presence channel errors.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("invalid presence URL: {0}")]
    InvalidUrl(String),
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(String),
    #[error("message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}
