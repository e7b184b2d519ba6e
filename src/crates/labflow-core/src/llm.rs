//! Generation backend boundary
//!
//! The engine does not generate text itself. Agent nodes talk to a backend
//! through the [`ChatModel`] trait, so the same graph can run against a remote
//! API, a local model or a scripted test double.
//!
//! ```text
//!   Agent node ──► ChatRequest { messages, tools, config, agent } ──► ChatModel::chat
//!                                                                        │
//!              ◄──────────────── ChatResponse { message, usage } ◄───────┘
//! ```
//!
//! Tools are advertised as [`ToolDefinition`]s. A backend answers either with
//! text or with [`ToolCall`]s on the reply message; running those calls is the
//! job of a [`ToolExecutor`], and the results go back to the model as tool
//! messages.

use crate::error::Result;
use crate::messages::{Message, ToolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Definition of a tool an agent may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// What the tool does, shown to the model
    pub description: String,
    /// JSON Schema of the arguments
    pub parameters: JsonValue,
}

impl ToolDefinition {
    /// Create a tool taking no arguments
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    /// Set the argument schema
    pub fn with_parameters(mut self, parameters: JsonValue) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Shape the reply must take
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Free-form text
    #[default]
    Text,
    /// A single JSON object
    Json,
}

/// Generation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    /// Required reply shape
    #[serde(default)]
    pub format: ResponseFormat,
}

/// A single generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation sent to the model
    pub messages: Vec<Message>,
    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    /// Generation settings
    #[serde(default)]
    pub config: ChatConfig,
    /// Agent issuing the request, for logging and test doubles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl ChatRequest {
    /// Create a request with default settings
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            config: ChatConfig::default(),
            agent: None,
        }
    }

    /// Advertise tools
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the reply shape
    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Tag the request with the issuing agent
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// A completed generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Reply from the model
    pub message: Message,
    /// Token usage, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
}

impl ChatResponse {
    /// Response without usage information
    pub fn new(message: Message) -> Self {
        Self { message, usage: None }
    }

    /// Text of the reply
    pub fn text(&self) -> &str {
        self.message.text()
    }
}

/// Chat-based generation backend
///
/// Implementations must be `Send + Sync`; share them as `Arc<dyn ChatModel>`.
/// Failures should be reported as [`GraphError::Backend`](crate::GraphError::Backend).
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete reply
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Identifier used in logs
    fn model_name(&self) -> &str {
        "chat-model"
    }
}

/// Runs the tools a model asks for
///
/// A failing tool is reported as an error and fails the calling node.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run one call and return its output as text
    async fn execute(&self, call: &ToolCall) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new(vec![Message::human("hi")])
            .with_temperature(0.2)
            .with_format(ResponseFormat::Json)
            .with_agent("NoteTaker")
            .with_tools(vec![ToolDefinition::new("web_search", "Search the web")]);

        assert_eq!(request.config.temperature, Some(0.2));
        assert_eq!(request.config.format, ResponseFormat::Json);
        assert_eq!(request.agent.as_deref(), Some("NoteTaker"));
        assert_eq!(request.tools[0].name, "web_search");
    }

    #[test]
    fn test_request_serialization_skips_empty_fields() {
        let request = ChatRequest::new(vec![Message::human("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("agent").is_none());
        assert_eq!(json["config"]["format"], "text");
    }
}
