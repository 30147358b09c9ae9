//! Valves: the pipeline's host-editable configuration

use crate::error::Result;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default Ollama server address
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Environment variable consulted by [`Valves::from_env`] and [`Valves::load`]
pub const OLLAMA_BASE_URL_ENV: &str = "OLLAMA_BASE_URL";

/// Configuration the host can read and replace at any time.
///
/// Serialized with the host's key name (`OLLAMA_BASE_URL`). Config files
/// read by [`Valves::load`] use the lowercase key `ollama_base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valves {
    /// Base URL of the Ollama server (e.g., "http://localhost:11434")
    #[serde(rename = "OLLAMA_BASE_URL", alias = "ollama_base_url")]
    pub ollama_base_url: String,
}

impl Default for Valves {
    fn default() -> Self {
        Self {
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
        }
    }
}

impl Valves {
    /// Create valves pointing at the given server
    pub fn new(ollama_base_url: impl Into<String>) -> Self {
        Self {
            ollama_base_url: ollama_base_url.into(),
        }
    }

    /// Create valves from the environment, falling back to the default URL
    pub fn from_env() -> Self {
        let _ = dotenv();

        let ollama_base_url = std::env::var(OLLAMA_BASE_URL_ENV)
            .unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.to_string());

        Self { ollama_base_url }
    }

    /// Layer defaults, an optional config file and the environment.
    ///
    /// The file format is picked from its extension (TOML, JSON, YAML, ...).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenv();

        let mut builder = config::Config::builder()
            .set_default("ollama_base_url", DEFAULT_OLLAMA_BASE_URL)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        if let Ok(url) = std::env::var(OLLAMA_BASE_URL_ENV) {
            builder = builder.set_override("ollama_base_url", url)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Whether a base URL is set at all
    pub fn is_configured(&self) -> bool {
        !self.ollama_base_url.is_empty()
    }
}
