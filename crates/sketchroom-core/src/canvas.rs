//! Canvas session: completed strokes, the gesture in progress, style and
//! viewport of one drawing surface.

use crate::capture::CaptureController;
use crate::input::{GestureInput, PointerEvent};
use crate::stroke::Stroke;
use crate::style::{StyleConfig, StyleState};
use crate::color::Color;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Displayed size of the surface.
///
/// Stroke coordinates are in logical surface units; `scale_factor` maps them
/// to device pixels at export time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scale_factor: 1.0,
        }
    }

    /// Set the device pixel ratio.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Size in device pixels, rounded. Negative or NaN dimensions yield zero.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |v: f64| {
            let scaled = (v * self.scale_factor).round();
            if scaled.is_finite() && scaled > 0.0 {
                scaled.min(u32::MAX as f64) as u32
            } else {
                0
            }
        };
        (px(self.width), px(self.height))
    }

    pub fn is_empty(&self) -> bool {
        let (w, h) = self.pixel_size();
        w == 0 || h == 0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// State owned by one drawing surface.
#[derive(Debug, Clone, Default)]
pub struct CanvasSession {
    /// Completed strokes, oldest first. Insertion order is z-order.
    strokes: Vec<Stroke>,
    capture: CaptureController,
    style: StyleState,
    viewport: Viewport,
}

impl CanvasSession {
    /// Create an empty session with default style bounds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StyleConfig) -> Self {
        Self {
            style: StyleState::new(config),
            ..Self::default()
        }
    }

    // --- Gestures ---

    pub fn gesture_start(&mut self, point: Point) {
        self.capture.start(point, &self.style);
    }

    pub fn gesture_move(&mut self, point: Point) {
        self.capture.extend(point);
    }

    /// End the gesture; the stroke joins the completed list.
    pub fn gesture_end(&mut self) {
        if let Some(stroke) = self.capture.end() {
            self.strokes.push(stroke);
        }
    }

    /// Abandon the gesture in progress without committing it.
    pub fn gesture_cancel(&mut self) {
        self.capture.cancel();
    }

    /// Feed a raw pointer event through the gesture state machine.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        match event.gesture() {
            GestureInput::Start(p) => self.gesture_start(p),
            GestureInput::Move(p) => self.gesture_move(p),
            GestureInput::End => self.gesture_end(),
            GestureInput::Ignore => {}
        }
    }

    // --- Strokes ---

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn active_stroke(&self) -> Option<&Stroke> {
        self.capture.active_stroke()
    }

    /// Remove the newest completed stroke.
    pub fn undo_last_stroke(&mut self) -> Option<Stroke> {
        self.strokes.pop()
    }

    /// Drop every stroke, including one being drawn.
    pub fn clear(&mut self) {
        self.capture.cancel();
        self.strokes.clear();
    }

    /// Replace the completed strokes (used when restoring a saved session).
    pub fn load_strokes(&mut self, strokes: Vec<Stroke>) {
        self.capture.cancel();
        self.strokes = strokes;
    }

    // --- Style ---

    pub fn style(&self) -> &StyleState {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut StyleState {
        &mut self.style
    }

    pub fn background_color(&self) -> Color {
        self.style.background_color()
    }

    // --- Viewport ---

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Track the displayed size. Strokes are in surface space and are kept
    /// as they are.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseButton;

    fn draw(session: &mut CanvasSession, points: &[(f64, f64)]) {
        let mut iter = points.iter();
        if let Some(&(x, y)) = iter.next() {
            session.gesture_start(Point::new(x, y));
        }
        for &(x, y) in iter {
            session.gesture_move(Point::new(x, y));
        }
        session.gesture_end();
    }

    #[test]
    fn test_completed_strokes_keep_order() {
        let mut session = CanvasSession::new();
        draw(&mut session, &[(0.0, 0.0), (1.0, 1.0)]);
        draw(&mut session, &[(5.0, 5.0), (6.0, 6.0)]);

        assert_eq!(session.stroke_count(), 2);
        assert_eq!(session.strokes()[0].points()[0], Point::new(0.0, 0.0));
        assert_eq!(session.strokes()[1].points()[0], Point::new(5.0, 5.0));
        assert!(session.active_stroke().is_none());
    }

    #[test]
    fn test_active_stroke_not_in_completed_list() {
        let mut session = CanvasSession::new();
        session.gesture_start(Point::new(0.0, 0.0));
        session.gesture_move(Point::new(3.0, 0.0));

        assert_eq!(session.stroke_count(), 0);
        assert_eq!(session.active_stroke().map(|s| s.len()), Some(2));

        session.gesture_cancel();
        session.gesture_end();
        assert!(session.active_stroke().is_none());
        assert_eq!(session.stroke_count(), 0);
    }

    #[test]
    fn test_move_and_end_without_start_are_noops() {
        let mut session = CanvasSession::new();
        draw(&mut session, &[(0.0, 0.0), (1.0, 0.0)]);
        let before = session.strokes().to_vec();

        session.gesture_move(Point::new(9.0, 9.0));
        session.gesture_end();

        assert_eq!(session.strokes(), before.as_slice());
        assert!(session.active_stroke().is_none());
    }

    #[test]
    fn test_eraser_stroke_uses_background() {
        let mut session = CanvasSession::new();
        session.style_mut().set_pen_color(Color::rgb(0, 200, 0));
        session.style_mut().set_background_color(Color::BLACK);
        session.style_mut().toggle_eraser();

        draw(&mut session, &[(0.0, 0.0), (4.0, 4.0)]);
        assert_eq!(session.strokes()[0].color(), Color::BLACK);
    }

    #[test]
    fn test_resize_preserves_strokes() {
        let mut session = CanvasSession::new();
        session.resize(800.0, 600.0);
        draw(&mut session, &[(10.0, 10.0), (20.0, 20.0)]);
        session.gesture_start(Point::new(30.0, 30.0));

        session.resize(400.0, 300.0);

        assert_eq!(session.viewport().size(), Size::new(400.0, 300.0));
        assert_eq!(session.strokes()[0].points()[1], Point::new(20.0, 20.0));
        assert!(session.active_stroke().is_some());
    }

    #[test]
    fn test_pointer_events_drive_gestures() {
        let mut session = CanvasSession::new();
        let events = [
            PointerEvent::Down {
                position: Point::new(1.0, 1.0),
                button: MouseButton::Left,
            },
            PointerEvent::Move {
                position: Point::new(2.0, 2.0),
            },
            PointerEvent::Leave,
        ];
        for e in &events {
            session.handle_pointer_event(e);
        }
        assert_eq!(session.stroke_count(), 1);
        assert_eq!(session.strokes()[0].len(), 2);
    }

    #[test]
    fn test_undo_and_clear() {
        let mut session = CanvasSession::new();
        draw(&mut session, &[(0.0, 0.0)]);
        draw(&mut session, &[(1.0, 1.0)]);

        let undone = session.undo_last_stroke().unwrap();
        assert_eq!(undone.points()[0], Point::new(1.0, 1.0));
        assert_eq!(session.stroke_count(), 1);

        session.gesture_start(Point::new(2.0, 2.0));
        session.clear();
        assert_eq!(session.stroke_count(), 0);
        assert!(session.active_stroke().is_none());
    }

    #[test]
    fn test_viewport_pixel_size() {
        assert_eq!(Viewport::new(100.4, 50.6).pixel_size(), (100, 51));
        assert_eq!(
            Viewport::new(100.0, 50.0).with_scale_factor(2.0).pixel_size(),
            (200, 100)
        );
        assert!(Viewport::new(0.0, 10.0).is_empty());
        assert!(Viewport::new(-5.0, 10.0).is_empty());
        assert!(Viewport::default().is_empty());
    }
}
