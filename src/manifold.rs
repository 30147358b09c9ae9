//! Ollama manifold pipeline
//!
//! Exposes every model installed on an Ollama server to the host, and relays
//! chat completions to the server's OpenAI-compatible endpoint.
//!
//! ```rust,no_run
//! use ollama_manifold::prelude::*;
//! use serde_json::json;
//!
//! # async fn run() {
//! let manifold = OllamaManifold::new();
//! manifold.on_startup().await;
//!
//! for model in manifold.pipelines().await {
//!     println!("{}{}", manifold.name(), model.name);
//! }
//!
//! let body = json!({
//!     "stream": false,
//!     "messages": [{"role": "user", "content": "Why is the sky blue?"}]
//! });
//! let _output = manifold
//!     .pipe("Why is the sky blue?", "llama3:8b", &[], body.as_object().unwrap().clone())
//!     .await;
//! # }
//! ```

use crate::config::Valves;
use crate::error::{Error, Result};
use crate::ollama::OllamaClient;
use crate::pipeline::{PipeOutput, Pipeline};
use crate::stream::LineStream;
use crate::tracing_ext::log_user_request;
use crate::types::{Message, ModelDescriptor, PipelineInfo, PipelineKind, UserInfo};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Identifier reported to the host
pub const MANIFOLD_ID: &str = "ollama_manifold";

/// Display prefix for the models of this manifold
pub const MANIFOLD_NAME: &str = "Ollama: ";

/// Model entry shown when the server cannot be queried
pub const FETCH_MODELS_FAILED: &str =
    "Could not fetch models from Ollama, please update the URL in the valves.";

/// Manifold pipeline backed by an Ollama server
pub struct OllamaManifold {
    /// HTTP client
    client: OllamaClient,
    /// Host-editable configuration
    valves: RwLock<Valves>,
}

impl Default for OllamaManifold {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaManifold {
    /// Create a manifold with default valves
    pub fn new() -> Self {
        Self::with_valves(Valves::default())
    }

    /// Create a manifold with the given valves
    pub fn with_valves(valves: Valves) -> Self {
        Self {
            client: OllamaClient::new(),
            valves: RwLock::new(valves),
        }
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, ...)
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = OllamaClient::with_client(client);
        self
    }

    fn snapshot(&self) -> Valves {
        self.valves.read().clone()
    }

    /// List the models installed on the server.
    ///
    /// Returns nothing when no base URL is set. Any failure is logged and
    /// replaced by a single entry asking the user to fix the URL, so the
    /// host's model picker is never left without an explanation.
    pub async fn list_models(&self) -> Vec<ModelDescriptor> {
        let valves = self.snapshot();
        if !valves.is_configured() {
            return Vec::new();
        }

        match self.fetch_models(&valves.ollama_base_url).await {
            Ok(models) => models,
            Err(e) => {
                warn!("Error: {}", e);
                vec![ModelDescriptor::new(MANIFOLD_ID, FETCH_MODELS_FAILED)]
            }
        }
    }

    async fn fetch_models(&self, base_url: &str) -> Result<Vec<ModelDescriptor>> {
        let tags = self.client.tags(base_url).await?;
        debug!(count = tags.models.len(), "fetched Ollama models");

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelDescriptor::new(m.model, m.name))
            .collect())
    }

    /// Forward a chat completion to the server.
    ///
    /// `body` is sent as-is with `model` replaced by `model_id`. Its `stream`
    /// flag picks the result: a line stream when true, the parsed response
    /// when false. Errors come back as [`PipeOutput::Failed`].
    pub async fn complete(
        &self,
        user_message: &str,
        model_id: &str,
        _messages: &[Message],
        body: Map<String, Value>,
    ) -> PipeOutput {
        if let Some(user) = UserInfo::from_body(&body) {
            log_user_request(&user, user_message);
        }

        match self.forward(model_id, body).await {
            Ok(output) => output,
            Err(e) => PipeOutput::failed(&e),
        }
    }

    async fn forward(&self, model_id: &str, mut body: Map<String, Value>) -> Result<PipeOutput> {
        let stream = stream_flag(&body)?;
        body.insert("model".to_string(), Value::String(model_id.to_string()));

        let valves = self.snapshot();
        let response = self
            .client
            .chat_completions(&valves.ollama_base_url, &body)
            .await?;

        if stream {
            return Ok(PipeOutput::Streaming(LineStream::from_response(response)));
        }

        let bytes = response.bytes().await?;
        Ok(PipeOutput::Complete(serde_json::from_slice(&bytes)?))
    }
}

fn stream_flag(body: &Map<String, Value>) -> Result<bool> {
    match body.get("stream") {
        Some(Value::Bool(stream)) => Ok(*stream),
        Some(other) => Err(Error::invalid_request(format!(
            "`stream` must be a boolean, got {}",
            other
        ))),
        None => Err(Error::invalid_request("request body has no `stream` flag")),
    }
}

#[async_trait]
impl Pipeline for OllamaManifold {
    fn info(&self) -> PipelineInfo {
        PipelineInfo {
            kind: PipelineKind::Manifold,
            id: MANIFOLD_ID.to_string(),
            name: MANIFOLD_NAME.to_string(),
        }
    }

    fn valves(&self) -> Valves {
        self.snapshot()
    }

    fn update_valves(&self, valves: Valves) {
        *self.valves.write() = valves;
    }

    async fn on_startup(&self) {
        info!("on_startup:{}", module_path!());
    }

    async fn on_shutdown(&self) {
        info!("on_shutdown:{}", module_path!());
    }

    async fn pipelines(&self) -> Vec<ModelDescriptor> {
        self.list_models().await
    }

    async fn pipe(
        &self,
        user_message: &str,
        model_id: &str,
        messages: &[Message],
        body: Map<String, Value>,
    ) -> PipeOutput {
        self.complete(user_message, model_id, messages, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::reload_valves;
    use crate::tracing_ext::capture::CapturedLogs;
    use futures::StreamExt;
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn manifold_for(server: &mockito::Server) -> OllamaManifold {
        OllamaManifold::with_valves(Valves::new(server.url()))
    }

    #[test]
    fn test_identity() {
        let manifold = OllamaManifold::new();
        assert_eq!(manifold.kind(), PipelineKind::Manifold);
        assert_eq!(manifold.id(), "ollama_manifold");
        assert_eq!(manifold.name(), "Ollama: ");
        assert_eq!(manifold.valves().ollama_base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_list_models_empty_base_url() {
        let manifold = OllamaManifold::with_valves(Valves::new(""));
        assert!(manifold.list_models().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_models_maps_and_preserves_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"models":[
                    {"model":"llama2","name":"Llama 2"},
                    {"model":"mistral:7b","name":"Mistral"},
                    {"model":"codellama","name":"Code Llama","size":1}
                ]}"#,
            )
            .create_async()
            .await;

        let models = manifold_for(&server).pipelines().await;
        assert_eq!(
            models,
            vec![
                ModelDescriptor::new("llama2", "Llama 2"),
                ModelDescriptor::new("mistral:7b", "Mistral"),
                ModelDescriptor::new("codellama", "Code Llama"),
            ]
        );
        assert_eq!(
            serde_json::to_value(&models[0]).unwrap(),
            json!({"id": "llama2", "name": "Llama 2"})
        );
    }

    #[tokio::test]
    async fn test_list_models_connection_refused() {
        let manifold = OllamaManifold::with_valves(Valves::new("http://127.0.0.1:1"));
        let models = manifold.list_models().await;
        assert_eq!(models, vec![ModelDescriptor::new(MANIFOLD_ID, FETCH_MODELS_FAILED)]);
    }

    #[tokio::test]
    async fn test_list_models_malformed_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let models = manifold_for(&server).list_models().await;
        assert_eq!(models.len(), 1);
        assert!(models[0].name.contains("Could not fetch models"));
    }

    #[tokio::test]
    async fn test_list_models_not_found_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(404)
            .with_body("404 page not found")
            .create_async()
            .await;

        let models = manifold_for(&server).list_models().await;
        assert_eq!(models, vec![ModelDescriptor::new(MANIFOLD_ID, FETCH_MODELS_FAILED)]);
    }

    #[tokio::test]
    async fn test_list_models_missing_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"no model field"}]}"#)
            .create_async()
            .await;

        let models = manifold_for(&server).list_models().await;
        assert_eq!(models, vec![ModelDescriptor::new(MANIFOLD_ID, FETCH_MODELS_FAILED)]);
    }

    #[tokio::test]
    async fn test_complete_overrides_model_and_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::Json(json!({
                "model": "m1",
                "stream": false,
                "temperature": 0.2,
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"chatcmpl-1","choices":[{"message":{"role":"assistant","content":"hello"}}]}"#)
            .create_async()
            .await;

        let output = manifold_for(&server)
            .pipe(
                "hi",
                "m1",
                &[Message::user("hi")],
                body(json!({
                    "model": "ollama_manifold.m1",
                    "stream": false,
                    "temperature": 0.2,
                    "messages": [{"role": "user", "content": "hi"}]
                })),
            )
            .await;

        mock.assert_async().await;
        let value = output.into_value().expect("complete response");
        assert_eq!(value["choices"][0]["message"]["content"], "hello");
    }

    #[tokio::test]
    async fn test_complete_streams_lines_in_order() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"model": "m1", "stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                 data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                 data: [DONE]\n\n",
            )
            .create_async()
            .await;

        let output = manifold_for(&server)
            .complete("hi", "m1", &[], body(json!({"stream": true, "messages": []})))
            .await;

        let lines: Vec<String> = output
            .into_stream()
            .expect("streaming response")
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(
            lines,
            vec![
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}",
                "",
                "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}",
                "",
                "data: [DONE]",
                "",
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_server_error_is_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("model 'm1' not found")
            .create_async()
            .await;

        let output = manifold_for(&server)
            .complete("hi", "m1", &[], body(json!({"stream": true})))
            .await;

        let message = output.failure().expect("failed output");
        assert!(message.starts_with("Error: "));
        assert!(message.contains("500"));
        assert!(message.contains("model 'm1' not found"));
    }

    #[tokio::test]
    async fn test_complete_invalid_json_is_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("{truncated")
            .create_async()
            .await;

        let output = manifold_for(&server)
            .complete("hi", "m1", &[], body(json!({"stream": false})))
            .await;
        assert!(output.failure().unwrap().starts_with("Error: Serialization error"));
    }

    #[tokio::test]
    async fn test_complete_timeout_is_failed() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let manifold = OllamaManifold::with_valves(Valves::new(format!("http://{}", addr)))
            .with_client(client);

        let output = manifold
            .complete("hi", "m1", &[], body(json!({"stream": false})))
            .await;
        assert!(output.failure().unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_complete_without_stream_flag_skips_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let manifold = manifold_for(&server);
        let output = manifold
            .complete("hi", "m1", &[], body(json!({"messages": []})))
            .await;
        assert_eq!(
            output.failure(),
            Some("Error: Invalid request: request body has no `stream` flag")
        );

        let output = manifold
            .complete("hi", "m1", &[], body(json!({"stream": "yes"})))
            .await;
        assert!(output.is_failed());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_with_user_still_forwards() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "model": "m1",
                "user": {"name": "Ada", "id": "u-1"}
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let output = manifold_for(&server)
            .complete(
                "hi",
                "m1",
                &[],
                body(json!({"stream": false, "user": {"name": "Ada", "id": "u-1"}})),
            )
            .await;

        mock.assert_async().await;
        assert_eq!(output.into_value(), Some(json!({})));
    }

    #[tokio::test]
    async fn test_user_logged_before_request_is_sent() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        // Nothing listens here, so no response ever arrives.
        let manifold = OllamaManifold::with_valves(Valves::new("http://127.0.0.1:1"));
        let output = manifold
            .complete(
                "what is rust?",
                "m1",
                &[],
                body(json!({"stream": true, "user": {"id": "u-7"}})),
            )
            .await;
        assert!(output.is_failed());

        let captured = logs.contents();
        assert!(captured.contains(r#"user.name="unknown""#), "{captured}");
        assert!(captured.contains(r#"user.id="u-7""#), "{captured}");
        assert!(captured.contains(r#"user_message="what is rust?""#), "{captured}");
    }

    #[tokio::test]
    async fn test_no_user_no_request_log() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let output = OllamaManifold::new()
            .complete("hi", "m1", &[], body(json!({"messages": []})))
            .await;
        assert!(output.is_failed());
        assert!(!logs.contents().contains("pipe request"));
    }

    #[tokio::test]
    async fn test_reload_valves_targets_new_server() {
        let mut first = mockito::Server::new_async().await;
        let mut second = mockito::Server::new_async().await;
        first
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"model":"a","name":"A"}]}"#)
            .create_async()
            .await;
        second
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"model":"b","name":"B"}]}"#)
            .create_async()
            .await;

        let manifold: Arc<dyn Pipeline> = Arc::new(manifold_for(&first));
        assert_eq!(manifold.pipelines().await[0].id, "a");

        reload_valves(manifold.as_ref(), Valves::new(second.url())).await;
        assert_eq!(manifold.valves().ollama_base_url, second.url());
        assert_eq!(manifold.pipelines().await[0].id, "b");
    }
}
