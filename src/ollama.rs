//! Ollama HTTP API client
//!
//! Talks to the two endpoints the manifold needs:
//!
//! - `GET /api/tags` lists locally available models
//! - `POST /v1/chat/completions` is Ollama's OpenAI-compatible chat endpoint
//!
//! The base URL is passed on every call rather than stored, so the owner can
//! swap it between calls without rebuilding the client.

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path of the model listing endpoint
pub const TAGS_PATH: &str = "/api/tags";

/// Path of the OpenAI-compatible chat completion endpoint
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Ollama client
#[derive(Debug, Clone, Default)]
pub struct OllamaClient {
    /// HTTP client
    client: Client,
}

impl OllamaClient {
    /// Create a client with reqwest defaults (no request timeout)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client on top of a preconfigured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the list of models available on the server
    pub async fn tags(&self, base_url: &str) -> Result<TagsResponse> {
        let url = format!("{}{}", base_url, TAGS_PATH);

        let response = self.client.get(&url).send().await?;
        let response = check_status(response, &url).await?;

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a chat completion request.
    ///
    /// The body is sent as given; a successful response is returned unread so
    /// the caller can decide between draining it as a stream and parsing it.
    pub async fn chat_completions(
        &self,
        base_url: &str,
        body: &Map<String, Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", base_url, CHAT_COMPLETIONS_PATH);

        let response = self.client.post(&url).json(body).send().await?;
        check_status(response, &url).await
    }
}

async fn check_status(response: Response, url: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(Error::Api {
        status: status.as_u16(),
        url: url.to_string(),
        message,
    })
}

/// Response of `GET /api/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsResponse {
    /// Models installed on the server
    pub models: Vec<TagModel>,
}

/// A single entry of `GET /api/tags`.
///
/// Ollama also reports size, digest and details; only the two fields the
/// model picker needs are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagModel {
    /// Model reference used in requests (e.g., "llama3:8b")
    pub model: String,
    /// Display name
    pub name: String,
}
