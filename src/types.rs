//! Core type definitions shared between the pipeline and its host

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of pipeline as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Exposes a single model
    Pipe,
    /// Exposes several selectable models
    Manifold,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Pipe => write!(f, "pipe"),
            PipelineKind::Manifold => write!(f, "manifold"),
        }
    }
}

/// Identity fields the host reads once when loading a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    /// Pipeline kind
    #[serde(rename = "type")]
    pub kind: PipelineKind,
    /// Unique identifier (alphanumeric, `_` or `-`)
    pub id: String,
    /// Display name, used as a prefix for manifold models
    pub name: String,
}

/// A model entry offered to the host's model picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier passed back to `pipe`
    pub id: String,
    /// Human-readable name
    pub name: String,
}

impl ModelDescriptor {
    /// Create a model descriptor
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool message
    Tool,
}

/// Conversation history entry handed over by the host.
///
/// Fields other than `role` and `content` (images, tool calls, ...) are kept
/// in `extra` so the message serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Message content; a string, or a list of parts for multimodal input
    #[serde(default)]
    pub content: Value,
    /// Any other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    fn with_text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Value::String(content.into()),
            extra: Map::new(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_text(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_text(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, content)
    }

    /// Text content, if the content is a plain string
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}

/// The user the host attaches to a request body under `user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Host-side user identifier
    #[serde(default)]
    pub id: Option<String>,
}

impl UserInfo {
    /// Extract the `user` field of a request body, if present.
    ///
    /// A `user` value that is not an object still counts as present, with
    /// both fields unknown.
    pub fn from_body(body: &Map<String, Value>) -> Option<Self> {
        let user = body.get("user")?;
        let field = |key: &str| {
            user.get(key).and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
        };

        Some(Self {
            name: field("name"),
            id: field("id"),
        })
    }
}
