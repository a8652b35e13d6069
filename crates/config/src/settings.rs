//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Session lifecycle configuration
    #[serde(default)]
    pub session: SessionSettings,

    /// Turn policy configuration
    #[serde(default)]
    pub turns: TurnSettings,

    /// Speaker identification configuration
    #[serde(default)]
    pub speaker: SpeakerSettings,

    /// Utterance audio validation bounds
    #[serde(default)]
    pub audio: AudioSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Maximum concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle timeout before a session is swept (seconds)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Interval between cleanup sweeps (seconds)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Bounded interaction history per session; oldest entries evicted
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_sessions() -> usize {
    100
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_history_limit() -> usize {
    50
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_timeout_secs: default_idle_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            history_limit: default_history_limit(),
        }
    }
}

impl SessionSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Turn policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSettings {
    /// Structured mode: minimum gap between turns (ms)
    #[serde(default = "default_structured_min_gap_ms")]
    pub structured_min_gap_ms: u64,

    /// Open mode: window after a turn during which other speakers queue (ms)
    #[serde(default = "default_open_queue_window_ms")]
    pub open_queue_window_ms: u64,

    /// How long a question may wait before a silence prompt is due (ms)
    #[serde(default = "default_response_prompt_after_ms")]
    pub response_prompt_after_ms: u64,

    /// How many recent turns the pattern analysis looks at
    #[serde(default = "default_analysis_window")]
    pub analysis_window: usize,
}

fn default_structured_min_gap_ms() -> u64 {
    2000
}

fn default_open_queue_window_ms() -> u64 {
    1000
}

fn default_response_prompt_after_ms() -> u64 {
    10_000
}

fn default_analysis_window() -> usize {
    5
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            structured_min_gap_ms: default_structured_min_gap_ms(),
            open_queue_window_ms: default_open_queue_window_ms(),
            response_prompt_after_ms: default_response_prompt_after_ms(),
            analysis_window: default_analysis_window(),
        }
    }
}

impl TurnSettings {
    pub fn structured_min_gap(&self) -> Duration {
        Duration::from_millis(self.structured_min_gap_ms)
    }

    pub fn open_queue_window(&self) -> Duration {
        Duration::from_millis(self.open_queue_window_ms)
    }

    pub fn response_prompt_after(&self) -> Duration {
        Duration::from_millis(self.response_prompt_after_ms)
    }
}

/// Speaker identification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSettings {
    /// Similarity above which a sample is folded into an existing speaker
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,

    /// Confidence bonus added per accumulated sample
    #[serde(default = "default_confidence_bonus_step")]
    pub confidence_bonus_step: f32,

    /// Cap on the accumulated-sample bonus
    #[serde(default = "default_confidence_bonus_cap")]
    pub confidence_bonus_cap: f32,

    /// Absolute cap on returned confidence
    #[serde(default = "default_confidence_cap")]
    pub confidence_cap: f32,

    /// Confidence reported for a newly minted speaker
    #[serde(default = "default_new_speaker_confidence")]
    pub new_speaker_confidence: f32,
}

fn default_match_threshold() -> f32 {
    0.7
}

fn default_confidence_bonus_step() -> f32 {
    0.05
}

fn default_confidence_bonus_cap() -> f32 {
    0.2
}

fn default_confidence_cap() -> f32 {
    0.99
}

fn default_new_speaker_confidence() -> f32 {
    0.5
}

impl Default for SpeakerSettings {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            confidence_bonus_step: default_confidence_bonus_step(),
            confidence_bonus_cap: default_confidence_bonus_cap(),
            confidence_cap: default_confidence_cap(),
            new_speaker_confidence: default_new_speaker_confidence(),
        }
    }
}

/// Utterance audio validation bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Minimum utterance size in bytes
    #[serde(default = "default_min_bytes")]
    pub min_bytes: usize,

    /// Maximum utterance size in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Sample rate audio is assumed to arrive at (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_min_bytes() -> usize {
    3200 // 100ms of PCM16 at 16kHz
}

fn default_max_bytes() -> usize {
    1_920_000 // 60s of PCM16 at 16kHz
}

fn default_sample_rate() -> u32 {
    16_000
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
            max_bytes: default_max_bytes(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level for the voice_floor crates
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_session()?;
        self.validate_turns()?;
        self.validate_speaker()?;
        self.validate_audio()?;
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        if self.session.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_sessions".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.session.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.history_limit".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn validate_turns(&self) -> Result<(), ConfigError> {
        if self.turns.analysis_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "turns.analysis_window".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.turns.response_prompt_after_ms < self.turns.structured_min_gap_ms {
            return Err(ConfigError::InvalidValue {
                field: "turns.response_prompt_after_ms".to_string(),
                message: format!(
                    "must not be shorter than the structured gap ({}ms)",
                    self.turns.structured_min_gap_ms
                ),
            });
        }
        Ok(())
    }

    fn validate_speaker(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("speaker.match_threshold", self.speaker.match_threshold),
            ("speaker.confidence_bonus_step", self.speaker.confidence_bonus_step),
            ("speaker.confidence_bonus_cap", self.speaker.confidence_bonus_cap),
            ("speaker.confidence_cap", self.speaker.confidence_cap),
            ("speaker.new_speaker_confidence", self.speaker.new_speaker_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("must be between 0.0 and 1.0, got {}", value),
                });
            }
        }
        Ok(())
    }

    fn validate_audio(&self) -> Result<(), ConfigError> {
        if self.audio.min_bytes >= self.audio.max_bytes {
            return Err(ConfigError::InvalidValue {
                field: "audio.min_bytes".to_string(),
                message: format!(
                    "must be smaller than audio.max_bytes ({})",
                    self.audio.max_bytes
                ),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audio.sample_rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Load settings from an optional file plus environment overrides
///
/// Priority: `VOICE_FLOOR_*` env vars > `<path>` (when given and present) >
/// built-in defaults. Env overrides use `__` as the section separator, e.g.
/// `VOICE_FLOOR_TURNS__STRUCTURED_MIN_GAP_MS=1500`.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(false));
    }

    let config = builder
        .add_source(Environment::with_prefix("VOICE_FLOOR").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.turns.structured_min_gap_ms, 2000);
        assert_eq!(settings.turns.open_queue_window_ms, 1000);
        assert_eq!(settings.turns.response_prompt_after_ms, 10_000);
        assert_eq!(settings.speaker.match_threshold, 0.7);
        assert_eq!(settings.speaker.new_speaker_confidence, 0.5);
    }

    #[test]
    fn test_invalid_speaker_threshold() {
        let mut settings = Settings::default();
        settings.speaker.match_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_audio_bounds() {
        let mut settings = Settings::default();
        settings.audio.min_bytes = settings.audio.max_bytes;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_file_deserializes() {
        let partial: Settings = toml::from_str(
            r#"
            [turns]
            structured_min_gap_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(partial.turns.structured_min_gap_ms, 1500);
        // Untouched sections keep defaults
        assert_eq!(partial.turns.open_queue_window_ms, 1000);
        assert_eq!(partial.session.max_sessions, 100);
    }

    #[test]
    fn test_load_without_file() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.session.history_limit, 50);
    }
}
