//! Toolboxes exposed to the orchestrator.

mod email;
mod wardrobe;
mod weather;

pub use email::Outbox;
pub use weather::{API_KEY_SETTING, WeatherTool};
