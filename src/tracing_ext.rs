//! Tracing setup and request diagnostics

use crate::types::UserInfo;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Subscriber settings for hosts that don't install their own
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            json: false,
        }
    }
}

impl TracingConfig {
    /// Switch to JSON output
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Set the fallback filter directive
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

/// Install a global fmt subscriber.
///
/// Returns `false` if a global subscriber was already set; the existing one
/// stays in place.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.is_ok()
}

/// Log who sent a request and what they asked, before it is forwarded
pub fn log_user_request(user: &UserInfo, user_message: &str) {
    info!(
        user.name = user.name.as_deref().unwrap_or("unknown"),
        user.id = user.id.as_deref().unwrap_or("unknown"),
        user_message,
        "pipe request"
    );
}
