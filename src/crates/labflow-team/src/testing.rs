//! Test doubles for running the workflow without a network
//!
//! [`ScriptedModel`] replays canned replies per agent and records every
//! request it receives. [`FailingModel`] fails every call. [`ScriptedTools`]
//! answers tool calls from a table.
//!
//! ```rust,ignore
//! use labflow_team::testing::ScriptedModel;
//! use labflow_team::Member;
//!
//! let model = ScriptedModel::new()
//!     .reply(Member::Hypothesis, "Caffeine shortens reaction time.")
//!     .reply(Member::Process, "Search")
//!     .fallback("ok");
//! ```

use crate::roster::Member;
use async_trait::async_trait;
use labflow_core::{
    ChatModel, ChatRequest, ChatResponse, GraphError, Message, Result as GraphResult, ToolCall, ToolExecutor,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Backend answering from per-agent queues
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<HashMap<String, VecDeque<Message>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `member`; replies are handed out in order
    pub fn reply(self, member: Member, text: impl Into<String>) -> Self {
        self.push(member, Message::assistant(text))
    }

    /// Queue a reply for `member` that asks for a tool instead of answering
    pub fn reply_tool_call(self, member: Member, call: ToolCall) -> Self {
        self.push(member, Message::assistant("").with_tool_calls(vec![call]))
    }

    fn push(self, member: Member, message: Message) -> Self {
        self.replies
            .lock()
            .entry(member.as_str().to_string())
            .or_default()
            .push_back(message);
        self
    }

    /// Reply used once an agent's queue is empty
    pub fn fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(text.into());
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    /// Requests issued by `member`
    pub fn requests_from(&self, member: Member) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.agent.as_deref() == Some(member.as_str()))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let agent = request.agent.clone().unwrap_or_default();
        self.requests.lock().push(request);

        let scripted = self
            .replies
            .lock()
            .get_mut(&agent)
            .and_then(VecDeque::pop_front);
        scripted
            .or_else(|| self.fallback.clone().map(Message::assistant))
            .map(ChatResponse::new)
            .ok_or_else(|| GraphError::backend("scripted", format!("no scripted reply left for '{}'", agent)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Backend that fails every call
#[derive(Debug, Clone)]
pub struct FailingModel {
    message: String,
}

impl FailingModel {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ChatModel for FailingModel {
    async fn chat(&self, _request: ChatRequest) -> GraphResult<ChatResponse> {
        Err(GraphError::backend("failing", self.message.clone()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Tool executor answering from a name -> output table
#[derive(Default)]
pub struct ScriptedTools {
    outputs: HashMap<String, String>,
    calls: Mutex<Vec<ToolCall>>,
}

impl ScriptedTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output returned for every call of `tool`
    pub fn output(mut self, tool: impl Into<String>, output: impl Into<String>) -> Self {
        self.outputs.insert(tool.into(), output.into());
        self
    }

    /// Every call executed so far
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ToolExecutor for ScriptedTools {
    async fn execute(&self, call: &ToolCall) -> GraphResult<String> {
        self.calls.lock().push(call.clone());
        self.outputs
            .get(&call.name)
            .cloned()
            .ok_or_else(|| GraphError::Execution(format!("tool '{}' has no scripted output", call.name)))
    }
}
