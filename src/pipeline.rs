//! Host-facing pipeline contract

use crate::config::Valves;
use crate::error::Error;
use crate::stream::LineStream;
use crate::types::{Message, ModelDescriptor, PipelineInfo, PipelineKind};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// Outcome of a `pipe` call
pub enum PipeOutput {
    /// Streamed response, drained line by line by the caller
    Streaming(LineStream),
    /// Fully read and parsed response
    Complete(Value),
    /// Failure description, always prefixed with `"Error: "`
    Failed(String),
}

impl PipeOutput {
    /// Build a failure from an error
    pub fn failed(err: &Error) -> Self {
        Self::Failed(format!("Error: {}", err))
    }

    /// Whether this is a failure
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The failure message, if any
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// The line stream, if the response is streamed
    pub fn into_stream(self) -> Option<LineStream> {
        match self {
            Self::Streaming(lines) => Some(lines),
            _ => None,
        }
    }

    /// The parsed response, if it was read in full
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Complete(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for PipeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming(lines) => f.debug_tuple("Streaming").field(lines).finish(),
            Self::Complete(value) => f.debug_tuple("Complete").field(value).finish(),
            Self::Failed(message) => f.debug_tuple("Failed").field(message).finish(),
        }
    }
}

/// A pipeline as seen by the host.
///
/// Host operations never fail: errors are folded into the returned values.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Identity fields
    fn info(&self) -> PipelineInfo;

    /// Pipeline kind
    fn kind(&self) -> PipelineKind {
        self.info().kind
    }

    /// Unique identifier
    fn id(&self) -> String {
        self.info().id
    }

    /// Display name
    fn name(&self) -> String {
        self.info().name
    }

    /// Snapshot of the current valves
    fn valves(&self) -> Valves;

    /// Replace the valves; later calls use the new values
    fn update_valves(&self, valves: Valves);

    /// Called when the host starts or after valves are updated
    async fn on_startup(&self);

    /// Called when the host stops or before valves are updated
    async fn on_shutdown(&self);

    /// Models offered by this pipeline
    async fn pipelines(&self) -> Vec<ModelDescriptor>;

    /// Run a completion for the selected model
    async fn pipe(
        &self,
        user_message: &str,
        model_id: &str,
        messages: &[Message],
        body: Map<String, Value>,
    ) -> PipeOutput;
}

/// Swap a pipeline's valves the way the host does: shut down, update, start.
pub async fn reload_valves<P: Pipeline + ?Sized>(pipeline: &P, valves: Valves) {
    pipeline.on_shutdown().await;
    pipeline.update_valves(valves);
    pipeline.on_startup().await;
}
