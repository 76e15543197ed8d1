//! Gesture capture: turns start/move/end pointer input into strokes.

use crate::stroke::Stroke;
use crate::style::StyleState;
use kurbo::Point;

/// State of the gesture in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GestureState {
    /// No pointer is down.
    #[default]
    Idle,
    /// A stroke is being drawn.
    Drawing {
        /// The in-progress stroke, owned exclusively by the controller.
        stroke: Stroke,
    },
}

/// Single-pointer gesture state machine.
#[derive(Debug, Clone, Default)]
pub struct CaptureController {
    state: GestureState,
}

impl CaptureController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a stroke at `point` using the style as it is right now.
    pub fn start(&mut self, point: Point, style: &StyleState) {
        if let GestureState::Drawing { stroke } = &self.state {
            log::warn!(
                "gesture started while stroke {} was active; discarding {} points",
                stroke.id(),
                stroke.len()
            );
        }

        let stroke = Stroke::begin(point, style.snapshot());
        log::debug!(
            "stroke {} started at ({}, {}) color {} width {}",
            stroke.id(),
            point.x,
            point.y,
            stroke.color(),
            stroke.width()
        );
        self.state = GestureState::Drawing { stroke };
    }

    /// Extend the active stroke. Inert when no gesture is active.
    pub fn extend(&mut self, point: Point) {
        if let GestureState::Drawing { stroke } = &mut self.state {
            stroke.add_point(point);
        }
    }

    /// Finish the gesture, handing back the completed stroke if there was one.
    pub fn end(&mut self) -> Option<Stroke> {
        match std::mem::take(&mut self.state) {
            GestureState::Drawing { stroke } => {
                log::debug!("stroke {} ended with {} points", stroke.id(), stroke.len());
                Some(stroke)
            }
            GestureState::Idle => None,
        }
    }

    /// Drop the active stroke without completing it.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, GestureState::Drawing { .. })
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        match &self.state {
            GestureState::Drawing { stroke } => Some(stroke),
            GestureState::Idle => None,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }
}
