//! Application configuration.

use sketchroom_core::{Color, StyleConfig, Viewport};
use sketchroom_core::style::DEFAULT_BACKGROUND;

/// Default persistence API, matching the relay's default port.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Surface size used when a script does not specify one.
    pub viewport: Viewport,
    pub style: StyleConfig,
    pub background_color: Color,
    /// Base URL of the persistence API; saves go to `{base_url}/visualart`.
    pub base_url: String,
    /// Presence relay WebSocket URL, if presence is wanted.
    pub presence_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(1280.0, 800.0),
            style: StyleConfig::default(),
            background_color: DEFAULT_BACKGROUND,
            base_url: DEFAULT_BASE_URL.to_string(),
            presence_url: None,
        }
    }
}
