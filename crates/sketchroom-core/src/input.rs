//! Pointer events delivered to the drawing surface.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Pointer event in surface coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        position: Point,
        #[serde(default)]
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    Up {
        position: Point,
        #[serde(default)]
        button: MouseButton,
    },
    /// Pointer left the surface.
    Leave,
}

/// What a pointer event means for the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureInput {
    Start(Point),
    Move(Point),
    End,
    Ignore,
}

impl PointerEvent {
    /// Map to gesture input. Only the primary button draws.
    pub fn gesture(&self) -> GestureInput {
        match *self {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => GestureInput::Start(position),
            PointerEvent::Move { position } => GestureInput::Move(position),
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            }
            | PointerEvent::Leave => GestureInput::End,
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => GestureInput::Ignore,
        }
    }
}
