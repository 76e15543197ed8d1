//! Sketchroom Core Library
//!
//! Platform-agnostic stroke capture, style state, canvas session and room
//! presence for the Sketchroom drawing surface.

pub mod canvas;
pub mod capture;
pub mod color;
pub mod input;
pub mod persistence;
pub mod presence;
pub mod stroke;
pub mod style;

pub use canvas::{CanvasSession, Viewport};
pub use capture::{CaptureController, GestureState};
pub use color::{Color, ColorParseError};
pub use input::{MouseButton, PointerEvent};
pub use persistence::{AuthorIdentity, MemoryGateway, PersistenceError, PersistenceGateway, SaveRequest};
pub use presence::{PresenceChannel, PresenceError, PresenceEvent, PresenceState, PresenceTransport};
pub use stroke::{InvalidStrokeWidth, Stroke, StrokeId, StrokeStyle};
pub use style::{StyleConfig, StyleConfigError, StyleState};
