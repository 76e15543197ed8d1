//! Sketchroom Application
//!
//! The drawing surface shell: wires the canvas session, raster export,
//! persistence gateway and room presence together, plus gesture-script
//! replay for the command line.

mod config;
mod gateway;
mod script;
mod surface;

pub use config::AppConfig;
pub use gateway::HttpGateway;
pub use script::{GestureScript, ScriptError, ScriptStep};
pub use surface::{DrawingSurface, SaveError};
