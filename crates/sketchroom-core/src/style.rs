//! User-editable drawing configuration.

use crate::color::Color;
use crate::stroke::StrokeStyle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default pen color of a fresh surface.
pub const DEFAULT_PEN_COLOR: Color = Color::WHITE;
/// Default pen width of a fresh surface.
pub const DEFAULT_PEN_WIDTH: f64 = 5.0;
/// Default background of a fresh surface.
pub const DEFAULT_BACKGROUND: Color = Color::BLACK;

/// Invalid width bounds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleConfigError {
    #[error("minimum pen width must be positive, got {0}")]
    NonPositiveMin(f64),
    #[error("minimum pen width {min} exceeds maximum {max}")]
    InvertedRange { min: f64, max: f64 },
}

/// Inclusive bounds for the pen width slider.
///
/// Deserialization goes through [`StyleConfig::new`], so a loaded config
/// holds the same invariants as one built in code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStyleConfig")]
pub struct StyleConfig {
    min_width: f64,
    max_width: f64,
}

#[derive(Deserialize)]
struct RawStyleConfig {
    min_width: f64,
    max_width: f64,
}

impl TryFrom<RawStyleConfig> for StyleConfig {
    type Error = StyleConfigError;

    fn try_from(raw: RawStyleConfig) -> Result<Self, Self::Error> {
        Self::new(raw.min_width, raw.max_width)
    }
}

impl StyleConfig {
    pub fn new(min_width: f64, max_width: f64) -> Result<Self, StyleConfigError> {
        // written this way so NaN fails too
        if !(min_width > 0.0) {
            return Err(StyleConfigError::NonPositiveMin(min_width));
        }
        if !(min_width <= max_width) {
            return Err(StyleConfigError::InvertedRange {
                min: min_width,
                max: max_width,
            });
        }
        Ok(Self {
            min_width,
            max_width,
        })
    }

    pub fn min_width(&self) -> f64 {
        self.min_width
    }

    pub fn max_width(&self) -> f64 {
        self.max_width
    }

    /// Round a requested width to whole pixels and clamp it into range.
    ///
    /// Bounds are not rounded, so a fractional bound still wins over the
    /// rounded request.
    pub fn clamp_width(&self, width: f64) -> f64 {
        if width.is_nan() {
            return self.min_width;
        }
        width.round().clamp(self.min_width, self.max_width)
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            min_width: 1.0,
            max_width: 100.0,
        }
    }
}

/// Pen color, pen width, background and eraser mode.
///
/// Exactly one color is active for new strokes: the background while the
/// eraser is engaged, the selected pen color otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleState {
    config: StyleConfig,
    pen_color: Color,
    pen_width: f64,
    background_color: Color,
    erase_mode: bool,
    /// Pen color saved when the eraser was engaged.
    saved_pen_color: Option<Color>,
}

impl Default for StyleState {
    fn default() -> Self {
        Self::new(StyleConfig::default())
    }
}

impl StyleState {
    pub fn new(config: StyleConfig) -> Self {
        Self {
            config,
            pen_color: DEFAULT_PEN_COLOR,
            pen_width: config.clamp_width(DEFAULT_PEN_WIDTH),
            background_color: DEFAULT_BACKGROUND,
            erase_mode: false,
            saved_pen_color: None,
        }
    }

    pub fn config(&self) -> StyleConfig {
        self.config
    }

    /// Select a pen color. While erasing this only changes the color that
    /// comes back when the eraser is turned off.
    pub fn set_pen_color(&mut self, color: Color) {
        if self.erase_mode {
            self.saved_pen_color = Some(color);
        } else {
            self.pen_color = color;
        }
    }

    /// Set the pen width, clamped to the configured range. Returns the width
    /// actually stored.
    pub fn set_pen_width(&mut self, width: f64) -> f64 {
        self.pen_width = self.config.clamp_width(width);
        self.pen_width
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    /// Flip eraser mode and return the new state.
    pub fn toggle_eraser(&mut self) -> bool {
        if self.erase_mode {
            if let Some(saved) = self.saved_pen_color.take() {
                self.pen_color = saved;
            }
            self.erase_mode = false;
        } else {
            self.saved_pen_color = Some(self.pen_color);
            self.erase_mode = true;
        }
        log::debug!("eraser {}", if self.erase_mode { "on" } else { "off" });
        self.erase_mode
    }

    pub fn is_erasing(&self) -> bool {
        self.erase_mode
    }

    /// The pen color the user picked, regardless of eraser mode.
    pub fn selected_color(&self) -> Color {
        if self.erase_mode {
            self.saved_pen_color.unwrap_or(self.pen_color)
        } else {
            self.pen_color
        }
    }

    /// Color new strokes are drawn with.
    pub fn effective_color(&self) -> Color {
        if self.erase_mode {
            self.background_color
        } else {
            self.pen_color
        }
    }

    pub fn pen_width(&self) -> f64 {
        self.pen_width
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    /// Immutable copy of the style for a stroke starting now.
    pub fn snapshot(&self) -> StrokeStyle {
        StrokeStyle {
            color: self.effective_color(),
            width: self.pen_width,
        }
    }
}
