//! Freehand strokes.

use crate::color::Color;
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for strokes.
pub type StrokeId = Uuid;

/// Line cap style. Strokes are always drawn with round caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCap {
    #[default]
    Round,
}

/// Line join style. Strokes are always drawn with round joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineJoin {
    #[default]
    Round,
}

/// Stroke width that is not a positive finite number.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("stroke width must be positive and finite, got {0}")]
pub struct InvalidStrokeWidth(pub f64);

/// Style captured when a stroke starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStrokeStyle")]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

#[derive(Deserialize)]
struct RawStrokeStyle {
    color: Color,
    width: f64,
}

impl TryFrom<RawStrokeStyle> for StrokeStyle {
    type Error = InvalidStrokeWidth;

    fn try_from(raw: RawStrokeStyle) -> Result<Self, Self::Error> {
        if !(raw.width > 0.0 && raw.width.is_finite()) {
            return Err(InvalidStrokeWidth(raw.width));
        }
        Ok(Self {
            color: raw.color,
            width: raw.width,
        })
    }
}

/// One continuous freehand gesture.
///
/// Points are append-only; the style is copied in at creation and has no
/// setter, so later changes to the style controls never reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    id: StrokeId,
    points: Vec<Point>,
    style: StrokeStyle,
    #[serde(default)]
    cap: LineCap,
    #[serde(default)]
    join: LineJoin,
}

impl Stroke {
    /// Start a stroke at `origin` with a style snapshot.
    pub fn begin(origin: Point, style: StrokeStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: vec![origin],
            style,
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }

    /// Build a finished stroke from recorded points.
    pub fn from_points(points: Vec<Point>, style: StrokeStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            style,
            cap: LineCap::Round,
            join: LineJoin::Round,
        }
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    /// Append a point to the path.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    pub fn color(&self) -> Color {
        self.style.color
    }

    pub fn width(&self) -> f64 {
        self.style.width
    }

    pub fn cap(&self) -> LineCap {
        self.cap
    }

    pub fn join(&self) -> LineJoin {
        self.join
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounds of the painted area (points inflated by half the width).
    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };

        let mut rect = Rect::from_points(*first, *first);
        for point in &self.points[1..] {
            rect = rect.union_pt(*point);
        }

        let half = self.style.width / 2.0;
        rect.inflate(half, half)
    }

    /// Connected path through the points: move-to the first, line-to the rest.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();

        let Some((first, rest)) = self.points.split_first() else {
            return path;
        };

        path.move_to(*first);
        for point in rest {
            path.line_to(*point);
        }

        path
    }
}
