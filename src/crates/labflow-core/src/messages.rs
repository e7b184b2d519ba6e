//! Conversation messages carried in graph state
//!
//! Messages are the unit of the append-only history that every node
//! contributes to. Each message records who spoke (the role), which node or
//! agent produced it (the author tag, stored in `name`), and its text.
//!
//! # Examples
//!
//! ```rust,ignore
//! use labflow_core::{Message, MessageRole};
//!
//! let seed = Message::human("Does caffeine improve reaction time?");
//! let reply = Message::assistant("Hypothesis: moderate doses help.").with_name("hypothesis_agent");
//!
//! assert_eq!(seed.role, MessageRole::Human);
//! assert_eq!(reply.name.as_deref(), Some("hypothesis_agent"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions given to a model
    System,
    /// Input from a person (seed request, checkpoint decisions, feedback)
    Human,
    /// Output produced by an agent
    Assistant,
    /// Result of a tool call, answering an assistant message
    Tool,
}

impl MessageRole {
    /// Wire name used by chat-completion style APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Human => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool invocation requested by a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier echoed back by the matching tool message
    pub id: String,
    /// Name of the requested tool
    pub name: String,
    /// Arguments, a JSON object matching the tool's schema
    pub arguments: JsonValue,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// A single history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author role
    pub role: MessageRole,
    /// Author tag (agent or checkpoint name), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Message text
    pub content: String,
    /// Tools the model asked to run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Call answered by a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a message with an explicit role
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Create a tool result answering `tool_call_id`
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut message = Self::new(MessageRole::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Attach the tool calls requested by a model
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = (!tool_calls.is_empty()).then_some(tool_calls);
        self
    }

    /// Tool calls requested by this message, empty when there are none
    pub fn requested_tools(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    /// Attach an author tag
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Message text
    pub fn text(&self) -> &str {
        &self.content
    }

    /// True when the content is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "[{}:{}] {}", self.role, name, self.content),
            None => write!(f, "[{}] {}", self.role, self.content),
        }
    }
}

/// Get the last message of a history, if any
pub fn get_last_message(messages: &[Message]) -> Option<&Message> {
    messages.last()
}
