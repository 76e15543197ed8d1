//! Sketchroom Render Library
//!
//! Deterministic CPU rasterization of a canvas session and PNG export.
//! The same strokes, background and pixel size always yield the same bytes.

mod encode;
mod exporter;

pub use encode::{DATA_URL_PREFIX, EncodedImage, RasterImage};
pub use exporter::{ExportError, ExportResult, MAX_DIMENSION, RasterExporter};
