//! OpenAI-compatible chat client.
//!
//! Works with any endpoint speaking the `/chat/completions` protocol: the
//! OpenAI API itself, Azure-style gateways, vLLM, LM Studio and similar.
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_llm::{OpenAiClient, RemoteLlmConfig, OPENAI_BASE_URL};
//! use labflow_core::{ChatModel, ChatRequest, Message};
//!
//! let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", OPENAI_BASE_URL, "gpt-4o")?;
//! let client = OpenAiClient::new(config)?;
//!
//! let response = client.chat(ChatRequest::new(vec![Message::human("Hello!")])).await?;
//! println!("{}", response.text());
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use labflow_core::{
    ChatModel, ChatRequest, ChatResponse, Message, MessageRole, ResponseFormat, ToolCall,
    ToolDefinition, UsageMetadata,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> crate::error::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn convert_message(msg: &Message) -> OpenAiMessage {
        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| OpenAiToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: OpenAiToolCallFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect()
        });
        // the API expects null content on a pure tool-call turn
        let content = if tool_calls.is_some() && msg.content.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };
        OpenAiMessage {
            role: msg.role.as_str().to_string(),
            content,
            name: msg.name.as_deref().map(sanitize_name),
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn convert_tool(tool: &ToolDefinition) -> OpenAiTool {
        OpenAiTool {
            kind: "function".to_string(),
            function: OpenAiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    fn build_body(&self, request: &ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.config.temperature.or(self.config.temperature),
            max_tokens: request.config.max_tokens,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(request.tools.iter().map(Self::convert_tool).collect())
            },
            response_format: match request.config.format {
                ResponseFormat::Text => None,
                ResponseFormat::Json => Some(OpenAiResponseFormat {
                    kind: "json_object".to_string(),
                }),
            },
            stream: false,
        }
    }

    fn convert_response(resp: OpenAiResponse) -> Result<ChatResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| -> Result<ToolCall, LlmError> {
                let arguments = if call.function.arguments.trim().is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    serde_json::from_str(&call.function.arguments)?
                };
                Ok(ToolCall::new(call.id, call.function.name, arguments))
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        let usage = resp.usage.map(|u| UsageMetadata {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens.unwrap_or(u.prompt_tokens + u.completion_tokens),
        });

        let content = choice.message.content.unwrap_or_default();
        Ok(ChatResponse {
            message: Message::new(MessageRole::Assistant, content).with_tool_calls(tool_calls),
            usage,
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = self.config.completions_url();
        let body = self.build_body(request);

        let mut req = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body);
        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        tracing::debug!(
            model = %self.config.model,
            agent = request.agent.as_deref().unwrap_or("-"),
            messages = body.messages.len(),
            "sending chat completion request"
        );

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), error_text));
        }

        let openai_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Self::convert_response(openai_resp)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> labflow_core::Result<ChatResponse> {
        self.send(&request).await.map_err(|err| {
            tracing::warn!(
                model = %self.config.model,
                retryable = err.is_retryable(),
                error = %err,
                "chat completion failed"
            );
            err.into_graph_error(&self.config.model)
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// The API only accepts `[a-zA-Z0-9_-]` in message names.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    kind: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Debug, Deserialize)]
struct OpenAiReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: OpenAiToolCallFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OPENAI_BASE_URL;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient::new(RemoteLlmConfig::new("test-key", OPENAI_BASE_URL, "gpt-4o").with_temperature(0.0))
            .unwrap()
    }

    #[test]
    fn test_message_conversion_all_roles() {
        let system = OpenAiClient::convert_message(&Message::system("rules"));
        let human = OpenAiClient::convert_message(&Message::human("question"));
        let assistant = OpenAiClient::convert_message(&Message::assistant("answer").with_name("Search Agent"));

        assert_eq!(system.role, "system");
        assert_eq!(human.role, "user");
        assert_eq!(assistant.role, "assistant");
        assert_eq!(assistant.name.as_deref(), Some("Search_Agent"));
    }

    #[test]
    fn test_body_for_json_request_with_tools() {
        let request = ChatRequest::new(vec![Message::human("compress these notes")])
            .with_format(ResponseFormat::Json)
            .with_tools(vec![ToolDefinition::new("read_document", "Read a file")]);
        let body = serde_json::to_value(client().build_body(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "read_document");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_body_for_plain_request_omits_optional_fields() {
        let request = ChatRequest::new(vec![Message::human("hi")]).with_temperature(0.7);
        let body = serde_json::to_value(client().build_body(&request)).unwrap();

        let temperature = body["temperature"].as_f64().unwrap();
        assert!((temperature - 0.7).abs() < 1e-6);
        assert!(body.get("tools").is_none());
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_response_conversion_basic() {
        let resp: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "Search"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13}
        }))
        .unwrap();

        let response = OpenAiClient::convert_response(resp).unwrap();
        assert_eq!(response.text(), "Search");
        assert_eq!(response.message.role, MessageRole::Assistant);
        assert_eq!(response.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn test_response_with_only_tool_calls() {
        let resp: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": null, "tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "web_search", "arguments": "{\"q\":\"caffeine\"}"}}
            ]}}]
        }))
        .unwrap();

        let response = OpenAiClient::convert_response(resp).unwrap();
        assert_eq!(response.text(), "");
        let calls = response.message.requested_tools();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].arguments, json!({"q": "caffeine"}));
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_tool_call_with_malformed_arguments_is_rejected() {
        let resp: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": "arxiv", "arguments": "{query"}}
            ]}}]
        }))
        .unwrap();
        assert!(matches!(
            OpenAiClient::convert_response(resp),
            Err(LlmError::SerializationError(_))
        ));
    }

    #[test]
    fn test_tool_turns_round_trip_to_wire_format() {
        let call = ToolCall::new("call_7", "arxiv", json!({"query": "caffeine"}));
        let request = OpenAiClient::convert_message(&Message::assistant("").with_tool_calls(vec![call]));
        let result = OpenAiClient::convert_message(&Message::tool("2 papers", "call_7"));

        let request = serde_json::to_value(request).unwrap();
        assert!(request.get("content").is_none());
        assert_eq!(request["tool_calls"][0]["type"], "function");
        assert_eq!(request["tool_calls"][0]["function"]["arguments"], r#"{"query":"caffeine"}"#);

        let result = serde_json::to_value(result).unwrap();
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_7");
    }

    #[test]
    fn test_response_without_choices_is_invalid() {
        let resp: OpenAiResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            OpenAiClient::convert_response(resp),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
