//! Agents and their capabilities
//!
//! An [`Agent`] is a backend plus a fixed capability set: role instructions,
//! the tools it may call, the roster of its peers and the working directory
//! it shares with them. The reasoning itself happens in the backend; this
//! module assembles requests, runs the tool calls the backend asks for and
//! returns the final reply.
//!
//! Tools only reach the backend when a [`ToolExecutor`] is bound. A backend
//! that asks for a tool anyway fails the agent with a configuration error.
//!
//! # Tiers
//!
//! | Tier | Used by | Default model |
//! |------|---------|---------------|
//! | `Light` | Hypothesis, Search, Visualization, QualityReview | `gpt-3.5-turbo` |
//! | `Power` | Process, Coder, Report, Refiner | `gpt-4o` |
//! | `Structured` | NoteTaker (JSON replies) | `gpt-4o` |

use crate::roster::Member;
use labflow_core::{
    ChatModel, ChatRequest, GraphError, Message, ResponseFormat, Result as GraphResult, ToolDefinition,
    ToolExecutor,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Capability tier of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Light,
    Power,
    Structured,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Light => "light",
            Tier::Power => "power",
            Tier::Structured => "structured",
        })
    }
}

/// Tools an agent may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    CreateDocument,
    ReadDocument,
    EditDocument,
    CollectData,
    ExecuteCode,
    ExecuteCommand,
    WebSearch,
    ScrapeWebpage,
    Encyclopedia,
    Arxiv,
}

impl ToolKind {
    /// Tool name announced to the backend
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateDocument => "create_document",
            Self::ReadDocument => "read_document",
            Self::EditDocument => "edit_document",
            Self::CollectData => "collect_data",
            Self::ExecuteCode => "execute_code",
            Self::ExecuteCommand => "execute_command",
            Self::WebSearch => "google_search",
            Self::ScrapeWebpage => "scrape_webpages",
            Self::Encyclopedia => "wikipedia",
            Self::Arxiv => "arxiv",
        }
    }

    /// Definition advertised in chat requests
    pub fn definition(&self) -> ToolDefinition {
        let (description, parameters) = match self {
            Self::CreateDocument => (
                "Create a document in the working directory from a list of points",
                json!({
                    "type": "object",
                    "properties": {
                        "points": {"type": "array", "items": {"type": "string"}},
                        "file_name": {"type": "string"}
                    },
                    "required": ["points", "file_name"]
                }),
            ),
            Self::ReadDocument => (
                "Read a document from the working directory, optionally a line range",
                json!({
                    "type": "object",
                    "properties": {
                        "file_name": {"type": "string"},
                        "start": {"type": "integer"},
                        "end": {"type": "integer"}
                    },
                    "required": ["file_name"]
                }),
            ),
            Self::EditDocument => (
                "Insert lines into a document in the working directory",
                json!({
                    "type": "object",
                    "properties": {
                        "file_name": {"type": "string"},
                        "inserts": {"type": "object", "additionalProperties": {"type": "string"}}
                    },
                    "required": ["file_name", "inserts"]
                }),
            ),
            Self::CollectData => (
                "Load a data file (CSV) from the working directory",
                json!({
                    "type": "object",
                    "properties": {"data_path": {"type": "string"}},
                    "required": ["data_path"]
                }),
            ),
            Self::ExecuteCode => (
                "Execute Python code and return its output",
                json!({
                    "type": "object",
                    "properties": {"input_code": {"type": "string"}},
                    "required": ["input_code"]
                }),
            ),
            Self::ExecuteCommand => (
                "Execute a shell command in the working directory",
                json!({
                    "type": "object",
                    "properties": {"command": {"type": "string"}},
                    "required": ["command"]
                }),
            ),
            Self::WebSearch => (
                "Search the web and return the top results",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            ),
            Self::ScrapeWebpage => (
                "Scrape the given web pages and return their main content",
                json!({
                    "type": "object",
                    "properties": {"urls": {"type": "array", "items": {"type": "string"}}},
                    "required": ["urls"]
                }),
            ),
            Self::Encyclopedia => (
                "Look up a topic in the encyclopedia",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            ),
            Self::Arxiv => (
                "Search academic papers on arXiv",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            ),
        };
        ToolDefinition::new(self.name(), description).with_parameters(parameters)
    }
}

/// Everything an agent is configured with, apart from its backend
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub member: Member,
    pub tier: Tier,
    pub tools: Vec<ToolKind>,
    pub instructions: String,
    pub roster: Vec<String>,
    pub working_directory: PathBuf,
    /// Reply shape requested from the backend
    pub format: ResponseFormat,
}

impl AgentSpec {
    pub fn new(member: Member, tier: Tier, instructions: impl Into<String>) -> Self {
        Self {
            member,
            tier,
            tools: Vec::new(),
            instructions: instructions.into(),
            roster: Member::peer_names(),
            working_directory: PathBuf::from("./data_storage/"),
            format: match tier {
                Tier::Structured => ResponseFormat::Json,
                Tier::Light | Tier::Power => ResponseFormat::Text,
            },
        }
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolKind>) -> Self {
        self.tools = tools.into_iter().collect();
        self
    }

    pub fn with_roster(mut self, roster: Vec<String>) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    /// System prompt sent ahead of the conversation
    pub fn system_prompt(&self) -> String {
        self.prompt_with_tools(&self.tools)
    }

    fn prompt_with_tools(&self, tools: &[ToolKind]) -> String {
        let tools = if tools.is_empty() {
            "none".to_string()
        } else {
            tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ")
        };
        format!(
            "You are the {role} member of a research team.\n\
             Team members: {roster}.\n\
             Shared working directory: {dir}. Read and write files only there.\n\
             Available tools: {tools}.\n\
             Complete your part of the task and report what you did; other members continue from your reply.\n\n\
             {instructions}",
            role = self.member,
            roster = self.roster.join(", "),
            dir = self.working_directory.display(),
            tools = tools,
            instructions = self.instructions.trim(),
        )
    }
}

/// Backends available to agents, one per tier
#[derive(Clone, Default)]
pub struct BackendRegistry {
    light: Option<Arc<dyn ChatModel>>,
    power: Option<Arc<dyn ChatModel>>,
    structured: Option<Arc<dyn ChatModel>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the backend for `tier`
    pub fn with_tier(mut self, tier: Tier, model: Arc<dyn ChatModel>) -> Self {
        match tier {
            Tier::Light => self.light = Some(model),
            Tier::Power => self.power = Some(model),
            Tier::Structured => self.structured = Some(model),
        }
        self
    }

    /// Use one backend for every tier
    pub fn uniform(model: Arc<dyn ChatModel>) -> Self {
        Self::new()
            .with_tier(Tier::Light, Arc::clone(&model))
            .with_tier(Tier::Power, Arc::clone(&model))
            .with_tier(Tier::Structured, model)
    }

    /// Backend bound to `tier`
    ///
    /// A missing tier is a configuration error: the agent needing it cannot
    /// be built.
    pub fn get(&self, tier: Tier) -> GraphResult<Arc<dyn ChatModel>> {
        let slot = match tier {
            Tier::Light => &self.light,
            Tier::Power => &self.power,
            Tier::Structured => &self.structured,
        };
        slot.clone()
            .ok_or_else(|| GraphError::configuration(format!("no backend configured for the '{}' tier", tier)))
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |slot: &Option<Arc<dyn ChatModel>>| slot.as_ref().map(|m| m.model_name().to_string());
        f.debug_struct("BackendRegistry")
            .field("light", &name(&self.light))
            .field("power", &name(&self.power))
            .field("structured", &name(&self.structured))
            .finish()
    }
}

/// Upper bound on backend round trips spent on tool calls in one invocation
pub const MAX_TOOL_ROUNDS: usize = 8;

/// A configured agent
#[derive(Clone)]
pub struct Agent {
    spec: AgentSpec,
    model: Arc<dyn ChatModel>,
    executor: Option<Arc<dyn ToolExecutor>>,
}

impl Agent {
    /// Bind a spec to the backend of its tier
    pub fn new(spec: AgentSpec, backends: &BackendRegistry) -> GraphResult<Self> {
        let model = backends.get(spec.tier)?;
        Ok(Self {
            spec,
            model,
            executor: None,
        })
    }

    /// Run the spec's tools through `executor`
    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Tools announced to the backend
    pub fn advertised_tools(&self) -> &[ToolKind] {
        match self.executor {
            Some(_) => self.spec.tools.as_slice(),
            None => &[],
        }
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    pub fn member(&self) -> Member {
        self.spec.member
    }

    /// Run the agent over the conversation so far
    ///
    /// `task` is appended as a final human turn when present. Tool calls are
    /// run and answered until the backend replies with text, at most
    /// [`MAX_TOOL_ROUNDS`] times. The reply is tagged with the agent's sender
    /// tag; the tool exchange itself stays out of the returned message.
    pub async fn invoke(&self, history: &[Message], task: Option<String>) -> GraphResult<Message> {
        let tools = self.advertised_tools();
        let definitions: Vec<ToolDefinition> = tools.iter().map(ToolKind::definition).collect();

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.spec.prompt_with_tools(tools)));
        messages.extend(history.iter().cloned());
        if let Some(task) = task {
            messages.push(Message::human(task));
        }

        let mut rounds = 0;
        loop {
            let request = ChatRequest::new(messages.clone())
                .with_tools(definitions.clone())
                .with_format(self.spec.format)
                .with_agent(self.spec.member.as_str());

            let response = self.model.chat(request).await?;
            tracing::info!(
                agent = %self.spec.member,
                model = self.model.model_name(),
                tokens = response.usage.map(|u| u.total_tokens).unwrap_or_default(),
                tool_calls = response.message.requested_tools().len(),
                "agent replied"
            );

            if response.message.requested_tools().is_empty() {
                return Ok(Message::assistant(response.message.content).with_name(self.spec.member.sender_tag()));
            }

            let Some(executor) = &self.executor else {
                let requested = response.message.requested_tools()[0].name.clone();
                return Err(GraphError::configuration(format!(
                    "agent '{}' requested tool '{}' but no tool executor is bound",
                    self.spec.member, requested
                )));
            };
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                return Err(GraphError::Execution(format!(
                    "agent '{}' kept calling tools after {} rounds",
                    self.spec.member, MAX_TOOL_ROUNDS
                )));
            }

            let calls = response.message.requested_tools().to_vec();
            messages.push(response.message);
            for call in calls {
                let output = if tools.iter().any(|tool| tool.name() == call.name) {
                    tracing::debug!(agent = %self.spec.member, tool = %call.name, "running tool");
                    executor.execute(&call).await?
                } else {
                    tracing::warn!(agent = %self.spec.member, tool = %call.name, "tool not granted to agent");
                    format!("error: tool '{}' is not available to this agent", call.name)
                };
                messages.push(Message::tool(output, call.id));
            }
        }
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("member", &self.spec.member)
            .field("tier", &self.spec.tier)
            .field("model", &self.model.model_name())
            .field("tools", &self.advertised_tools())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedModel, ScriptedTools};
    use labflow_core::{MessageRole, ToolCall};
    use serde_json::json;

    #[test]
    fn test_missing_tier_is_configuration_error() {
        let backends = BackendRegistry::new().with_tier(Tier::Light, Arc::new(ScriptedModel::new()));
        assert!(backends.get(Tier::Light).is_ok());
        let err = backends.get(Tier::Structured).err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("structured"));
    }

    #[test]
    fn test_system_prompt_mentions_capabilities() {
        let spec = AgentSpec::new(Member::Search, Tier::Light, "Find sources.")
            .with_tools([ToolKind::WebSearch, ToolKind::Arxiv])
            .with_working_directory("/tmp/lab");
        let prompt = spec.system_prompt();
        assert!(prompt.contains("Search member"));
        assert!(prompt.contains("google_search, arxiv"));
        assert!(prompt.contains("/tmp/lab"));
        assert!(prompt.contains("QualityReview"));
        assert!(prompt.ends_with("Find sources."));
    }

    #[test]
    fn test_tool_definitions_have_object_schemas() {
        for tool in [ToolKind::ReadDocument, ToolKind::ExecuteCode, ToolKind::ScrapeWebpage] {
            let definition = tool.definition();
            assert_eq!(definition.name, tool.name());
            assert_eq!(definition.parameters["type"], "object");
        }
    }

    fn coder(model: Arc<ScriptedModel>) -> Agent {
        Agent::new(
            AgentSpec::new(Member::Coder, Tier::Power, "Write code.").with_tools([ToolKind::ExecuteCode]),
            &BackendRegistry::uniform(model),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invoke_tags_reply_and_sends_tools() {
        let model = Arc::new(ScriptedModel::new().reply(Member::Coder, "ran the regression"));
        let agent = coder(model.clone()).with_tool_executor(Arc::new(ScriptedTools::new()));

        let reply = agent
            .invoke(&[Message::human("analyse caffeine.csv")], Some("go".into()))
            .await
            .unwrap();

        assert_eq!(reply.content, "ran the regression");
        assert_eq!(reply.name.as_deref(), Some("code_agent"));

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(sent.agent.as_deref(), Some("Coder"));
        assert_eq!(sent.tools[0].name, "execute_code");
        assert_eq!(sent.messages.len(), 3);
        assert_eq!(sent.messages[2], Message::human("go"));
    }

    #[tokio::test]
    async fn test_tools_hidden_without_executor() {
        let model = Arc::new(ScriptedModel::new().reply(Member::Coder, "done by hand"));
        let agent = coder(model.clone());
        assert!(agent.advertised_tools().is_empty());

        agent.invoke(&[], None).await.unwrap();
        let requests = model.requests();
        let sent = &requests[0];
        assert!(sent.tools.is_empty());
        assert!(sent.messages[0].content.contains("Available tools: none."));
    }

    #[tokio::test]
    async fn test_tool_call_without_executor_is_configuration_error() {
        let call = ToolCall::new("call_1", "execute_code", json!({"input_code": "print(1)"}));
        let model = Arc::new(ScriptedModel::new().reply_tool_call(Member::Coder, call));

        let err = coder(model).invoke(&[], None).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("execute_code"));
    }

    #[tokio::test]
    async fn test_tool_calls_are_run_and_answered() {
        let call = ToolCall::new("call_1", "execute_code", json!({"input_code": "print(1)"}));
        let model = Arc::new(
            ScriptedModel::new()
                .reply_tool_call(Member::Coder, call.clone())
                .reply(Member::Coder, "the script printed 1"),
        );
        let tools = Arc::new(ScriptedTools::new().output("execute_code", "1"));

        let reply = coder(model.clone())
            .with_tool_executor(tools.clone())
            .invoke(&[], Some("run it".into()))
            .await
            .unwrap();

        assert_eq!(reply.content, "the script printed 1");
        assert!(reply.tool_calls.is_none());
        assert_eq!(tools.calls(), vec![call]);

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        let followup = &requests[1].messages;
        let answer = followup.last().unwrap();
        assert_eq!(answer.role, MessageRole::Tool);
        assert_eq!(answer.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(answer.content, "1");
        assert_eq!(followup[followup.len() - 2].requested_tools().len(), 1);
    }

    #[tokio::test]
    async fn test_ungranted_tool_is_answered_with_error() {
        let call = ToolCall::new("call_9", "google_search", json!({"query": "caffeine"}));
        let model = Arc::new(
            ScriptedModel::new()
                .reply_tool_call(Member::Coder, call)
                .reply(Member::Coder, "searched nothing"),
        );
        let tools = Arc::new(ScriptedTools::new());

        let reply = coder(model.clone()).with_tool_executor(tools.clone()).invoke(&[], None).await.unwrap();

        assert_eq!(reply.content, "searched nothing");
        assert!(tools.calls().is_empty());
        let answer = model.requests()[1].messages.last().cloned().unwrap();
        assert!(answer.content.contains("not available"));
    }

    #[tokio::test]
    async fn test_failing_tool_fails_the_agent() {
        let call = ToolCall::new("call_1", "execute_code", json!({}));
        let model = Arc::new(ScriptedModel::new().reply_tool_call(Member::Coder, call));

        let err = coder(model)
            .with_tool_executor(Arc::new(ScriptedTools::new()))
            .invoke(&[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Execution(_)));
    }

    #[tokio::test]
    async fn test_endless_tool_calls_are_bounded() {
        let call = ToolCall::new("call_1", "execute_code", json!({}));
        let mut script = ScriptedModel::new();
        for _ in 0..=MAX_TOOL_ROUNDS {
            script = script.reply_tool_call(Member::Coder, call.clone());
        }
        let model = Arc::new(script);

        let err = coder(model.clone())
            .with_tool_executor(Arc::new(ScriptedTools::new().output("execute_code", "again")))
            .invoke(&[], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("kept calling tools"));
        assert_eq!(model.requests().len(), MAX_TOOL_ROUNDS + 1);
    }

    #[tokio::test]
    async fn test_structured_tier_requests_json() {
        let model = Arc::new(ScriptedModel::new().reply(Member::NoteTaker, "{}"));
        let backends = BackendRegistry::uniform(model.clone());
        let agent = Agent::new(AgentSpec::new(Member::NoteTaker, Tier::Structured, "Take notes."), &backends).unwrap();
        agent.invoke(&[], None).await.unwrap();
        assert_eq!(model.requests()[0].config.format, ResponseFormat::Json);
    }

    #[test]
    fn test_format_follows_tier_unless_overridden() {
        assert_eq!(AgentSpec::new(Member::Process, Tier::Power, "").format, ResponseFormat::Text);
        assert_eq!(
            AgentSpec::new(Member::Process, Tier::Power, "")
                .with_format(ResponseFormat::Json)
                .format,
            ResponseFormat::Json
        );
    }
}
