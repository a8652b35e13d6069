//! Tracing initialization

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::settings::Settings;

/// Initialize tracing from settings
///
/// Honors `RUST_LOG` when set; otherwise scopes the configured level to the
/// voice_floor crates. Safe to call once per process; later calls are no-ops
/// if a global subscriber is already installed.
pub fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("voice_floor={}", level).into()
    });

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed, keeping existing one");
    }
}
