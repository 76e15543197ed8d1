//! Recorded gesture scripts.
//!
//! A script is JSON:
//! ```json
//! {
//!   "viewport": { "width": 400, "height": 300 },
//!   "author": { "sub": "auth0|abc" },
//!   "steps": [
//!     { "op": "background", "color": "#202020" },
//!     { "op": "pen_color", "color": "#ff0000" },
//!     { "op": "pen_width", "width": 3 },
//!     { "op": "stroke", "points": [[10, 10], [20, 10], [20, 20]] },
//!     { "op": "pointer", "event": { "kind": "down", "position": { "x": 5, "y": 5 } } }
//!   ]
//! }
//! ```

use kurbo::Point;
use serde::{Deserialize, Serialize};
use sketchroom_core::{AuthorIdentity, CanvasSession, Color, PointerEvent, Viewport};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Background { color: Color },
    PenColor { color: Color },
    PenWidth { width: f64 },
    ToggleEraser,
    Resize { width: f64, height: f64 },
    /// A complete gesture through the given points.
    Stroke { points: Vec<[f64; 2]> },
    /// A raw pointer event.
    Pointer { event: PointerEvent },
    Undo,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GestureScript {
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub author: Option<AuthorIdentity>,
    pub steps: Vec<ScriptStep>,
}

impl GestureScript {
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Replay every step, in order, against `session`.
    pub fn apply(&self, session: &mut CanvasSession) {
        for step in &self.steps {
            apply_step(session, step);
        }
        log::debug!(
            "replayed {} steps, {} strokes",
            self.steps.len(),
            session.stroke_count()
        );
    }
}

fn apply_step(session: &mut CanvasSession, step: &ScriptStep) {
    match step {
        ScriptStep::Background { color } => session.style_mut().set_background_color(*color),
        ScriptStep::PenColor { color } => session.style_mut().set_pen_color(*color),
        ScriptStep::PenWidth { width } => {
            session.style_mut().set_pen_width(*width);
        }
        ScriptStep::ToggleEraser => {
            session.style_mut().toggle_eraser();
        }
        ScriptStep::Resize { width, height } => session.resize(*width, *height),
        ScriptStep::Stroke { points } => {
            let mut iter = points.iter().map(|&[x, y]| Point::new(x, y));
            if let Some(first) = iter.next() {
                session.gesture_start(first);
                for p in iter {
                    session.gesture_move(p);
                }
                session.gesture_end();
            }
        }
        ScriptStep::Pointer { event } => session.handle_pointer_event(event),
        ScriptStep::Undo => {
            session.undo_last_stroke();
        }
        ScriptStep::Clear => session.clear(),
    }
}
