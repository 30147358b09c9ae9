//! # Ollama Manifold
//!
//! A manifold pipeline that exposes the models of an Ollama server to a
//! pipeline host and relays chat completions to it.
//!
//! - **Model discovery**: `GET /api/tags`, reshaped into `{id, name}` entries
//! - **Chat completion**: `POST /v1/chat/completions`, returned either as a
//!   lazy stream of lines or as the parsed JSON response
//! - **Hot-reloadable valves**: the server URL can be swapped between calls
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ollama_manifold::prelude::*;
//! use futures::StreamExt;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manifold = OllamaManifold::with_valves(Valves::from_env());
//!     manifold.on_startup().await;
//!
//!     let body = json!({
//!         "stream": true,
//!         "messages": [{"role": "user", "content": "Hello!"}]
//!     });
//!     let output = manifold
//!         .pipe("Hello!", "llama3:8b", &[], body.as_object().cloned().unwrap_or_default())
//!         .await;
//!
//!     if let PipeOutput::Streaming(mut lines) = output {
//!         while let Some(line) = lines.next().await {
//!             println!("{}", line?);
//!         }
//!     }
//!
//!     manifold.on_shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod manifold;
pub mod ollama;
pub mod pipeline;
pub mod stream;
pub mod tracing_ext;
pub mod types;

// Re-exports for convenience
pub use config::Valves;
pub use error::{Error, Result};
pub use manifold::OllamaManifold;
pub use ollama::OllamaClient;
pub use pipeline::{reload_valves, PipeOutput, Pipeline};
pub use stream::LineStream;
pub use tracing_ext::{init_tracing, TracingConfig};
pub use types::{Message, ModelDescriptor, PipelineInfo, PipelineKind, Role, UserInfo};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::Valves;
    pub use crate::error::{Error, Result};
    pub use crate::manifold::OllamaManifold;
    pub use crate::pipeline::{PipeOutput, Pipeline};
    pub use crate::stream::LineStream;
    pub use crate::types::*;
}
