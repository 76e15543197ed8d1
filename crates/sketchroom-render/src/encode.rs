//! Pixel buffers and their PNG / data URL encodings.

use crate::exporter::{ExportError, ExportResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Prefix of every exported data URL.
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Straight (non-premultiplied) RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Build from a premultiplied RGBA8 buffer.
    pub(crate) fn from_premultiplied(width: u32, height: u32, data: &[u8]) -> Self {
        let mut pixels = Vec::with_capacity(data.len());
        for px in data.chunks_exact(4) {
            pixels.extend_from_slice(&unpremultiply([px[0], px[1], px[2], px[3]]));
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        self.pixels
            .get(i..i + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> ExportResult<EncodedImage> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);

            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }

        Ok(EncodedImage {
            width: self.width,
            height: self.height,
            png: png_data,
        })
    }
}

fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    match a {
        0 => [0, 0, 0, 0],
        255 => [r, g, b, a],
        _ => {
            let a32 = a as u32;
            let c = |v: u8| ((v as u32 * 255 + a32 / 2) / a32).min(255) as u8;
            [c(r), c(g), c(b), a]
        }
    }
}

/// A PNG-encoded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl EncodedImage {
    /// The PNG as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self) -> String {
        let mut url = String::with_capacity(DATA_URL_PREFIX.len() + self.png.len() * 4 / 3 + 4);
        url.push_str(DATA_URL_PREFIX);
        STANDARD.encode_string(&self.png, &mut url);
        url
    }
}

impl From<png::EncodingError> for ExportError {
    fn from(e: png::EncodingError) -> Self {
        ExportError::Encode(e.to_string())
    }
}
