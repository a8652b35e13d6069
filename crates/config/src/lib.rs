//! Configuration for the voice floor coordinator
//!
//! Settings are layered: built-in defaults, then an optional config file,
//! then `VOICE_FLOOR_*` environment overrides. Every section is
//! serde-defaulted so a partial file is valid.

pub mod settings;
pub mod telemetry;

pub use settings::{
    load_settings, AudioSettings, ObservabilityConfig, RuntimeEnvironment, SessionSettings,
    Settings, SpeakerSettings, TurnSettings,
};
pub use telemetry::init_tracing;

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
