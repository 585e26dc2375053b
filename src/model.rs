//! Inference backend abstraction
//!
//! The orchestrator talks to the model through a single `converse`
//! operation: model id, system prompt, message history, inference config
//! and an optional tool configuration in; an output message plus a stop
//! reason out. [`OpenAIBackend`] adapts that shape to async-openai chat
//! completions; [`MockBackend`] replays a script for tests and demos.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionResponseMessage, ChatCompletionTool, ChatCompletionToolArgs,
        ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FinishReason, FunctionCall, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::agent::InferenceConfig;
use crate::config::SwarmConfig;
use crate::error::{Result, SwarmError};
use crate::items::{ContentBlock, Message, Role, ToolResultContent, ToolUse};
use crate::schema::CallSpecification;
use crate::usage::Usage;

/// Why the backend stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    GuardrailIntervened,
    ContentFiltered,
    Other(String),
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::GuardrailIntervened => "guardrail_intervened",
            StopReason::ContentFiltered => "content_filtered",
            StopReason::Other(s) => s,
        }
    }

    pub fn is_tool_use(&self) -> bool {
        matches!(self, StopReason::ToolUse)
    }
}

impl From<String> for StopReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            "guardrail_intervened" => StopReason::GuardrailIntervened,
            "content_filtered" => StopReason::ContentFiltered,
            _ => StopReason::Other(s),
        }
    }
}

impl From<StopReason> for String {
    fn from(r: StopReason) -> Self {
        r.as_str().to_string()
    }
}

/// Tools advertised for one backend call. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    tools: Vec<CallSpecification>,
}

impl ToolConfig {
    /// `None` for an empty tool list: "no tools" is expressed by leaving the
    /// configuration out, never by sending an empty one.
    pub fn new(tools: Vec<CallSpecification>) -> Option<Self> {
        if tools.is_empty() {
            None
        } else {
            Some(Self { tools })
        }
    }

    pub fn tools(&self) -> &[CallSpecification] {
        &self.tools
    }

    /// Converse wire shape: `{"tools": [{"toolSpec": ..}, ..]}`
    pub fn to_value(&self) -> Value {
        let tools: Vec<Value> = self.tools.iter().map(|t| t.to_tool_spec()).collect();
        json!({ "tools": tools })
    }
}

impl Serialize for ToolConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Everything one `converse` call needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    pub model_id: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub inference_config: InferenceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
}

/// The backend's answer to one `converse` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub output: Message,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl BackendResponse {
    pub fn new(output: Message, stop_reason: StopReason) -> Self {
        Self {
            output,
            stop_reason,
            usage: Usage::empty(),
        }
    }

    /// A plain text reply that ends the turn.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Message::assistant(text), StopReason::EndTurn)
    }

    /// A reply asking for the given tool uses, in order.
    pub fn tool_uses(uses: Vec<ToolUse>) -> Self {
        let content = uses.into_iter().map(ContentBlock::ToolUse).collect();
        Self::new(Message::new(Role::Assistant, content), StopReason::ToolUse)
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// The inference capability the orchestrator depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run one inference round-trip. Failures propagate unmodified; no retry.
    async fn converse(&self, request: ConverseRequest) -> Result<BackendResponse>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn converse(&self, request: ConverseRequest) -> Result<BackendResponse> {
        (**self).converse(request).await
    }
}

// =============================
// OpenAI adapter
// =============================

/// Backend over the OpenAI chat completions API.
pub struct OpenAIBackend {
    client: Client<OpenAIConfig>,
}

impl OpenAIBackend {
    /// Uses `OPENAI_API_KEY` (and friends) from the environment.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    /// Honors `api_base` from the configuration when set.
    pub fn from_config(config: &SwarmConfig) -> Self {
        match &config.api_base {
            Some(base) => Self::with_client(Client::with_config(
                OpenAIConfig::new().with_api_base(base.clone()),
            )),
            None => Self::new(),
        }
    }
}

impl Default for OpenAIBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for OpenAIBackend {
    async fn converse(&self, request: ConverseRequest) -> Result<BackendResponse> {
        let openai_request = build_chat_request(&request)?;
        debug!(
            model = %request.model_id,
            messages = openai_request.messages.len(),
            tools = openai_request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "Sending chat completion request"
        );
        let response = self.client.chat().create(openai_request).await?;
        parse_chat_response(response)
    }
}

fn param_f32(config: &InferenceConfig, keys: &[&str]) -> Option<f32> {
    keys.iter()
        .find_map(|k| config.get(*k))
        .and_then(Value::as_f64)
        .map(|v| v as f32)
}

fn param_u32(config: &InferenceConfig, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|k| config.get(*k))
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

fn to_openai_tool(spec: &CallSpecification) -> Result<ChatCompletionTool> {
    let function = FunctionObjectArgs::default()
        .name(spec.name.clone())
        .description(spec.description.clone())
        .parameters(spec.input_schema())
        .build()?;
    Ok(ChatCompletionToolArgs::default()
        .r#type(ChatCompletionToolType::Function)
        .function(function)
        .build()?)
}

fn convert_message(msg: &Message) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = Vec::new();
    let text = msg.texts().collect::<Vec<_>>().join("\n");

    match msg.role {
        Role::User => {
            for result in msg.tool_results() {
                let content = result
                    .content
                    .iter()
                    .map(|c| match c {
                        ToolResultContent::Json(v) => v.to_string(),
                        ToolResultContent::Text(t) => t.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                out.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .content(content)
                        .tool_call_id(result.tool_use_id.clone())
                        .build()?
                        .into(),
                );
            }
            if !text.is_empty() {
                out.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text)
                        .build()?
                        .into(),
                );
            }
        }
        Role::Assistant => {
            let tool_calls: Vec<ChatCompletionMessageToolCall> = msg
                .tool_uses()
                .map(|u| ChatCompletionMessageToolCall {
                    id: u.tool_use_id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: u.name.clone(),
                        arguments: u.input.to_string(),
                    },
                })
                .collect();
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            builder.content(text);
            if !tool_calls.is_empty() {
                builder.tool_calls(tool_calls);
            }
            out.push(builder.build()?.into());
        }
    }
    Ok(out)
}

/// Map a converse request onto a chat completion request.
pub(crate) fn build_chat_request(req: &ConverseRequest) -> Result<CreateChatCompletionRequest> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(req.system.clone())
            .build()?
            .into(),
    ];
    for msg in &req.messages {
        messages.extend(convert_message(msg)?);
    }

    let mut builder = CreateChatCompletionRequestArgs::default();
    builder.model(req.model_id.clone()).messages(messages);

    if let Some(tool_config) = &req.tool_config {
        let tools = tool_config
            .tools()
            .iter()
            .map(to_openai_tool)
            .collect::<Result<Vec<_>>>()?;
        builder.tools(tools);
    }
    if let Some(t) = param_f32(&req.inference_config, &["temperature"]) {
        builder.temperature(t);
    }
    if let Some(p) = param_f32(&req.inference_config, &["topP", "top_p"]) {
        builder.top_p(p);
    }
    if let Some(m) = param_u32(&req.inference_config, &["maxTokens", "max_tokens"]) {
        builder.max_completion_tokens(m);
    }

    Ok(builder.build()?)
}

fn message_from_response(message: &ChatCompletionResponseMessage) -> Result<Message> {
    let mut content = Vec::new();
    if let Some(text) = message.content.as_deref() {
        if !text.is_empty() {
            content.push(ContentBlock::Text(text.to_string()));
        }
    }
    for call in message.tool_calls.iter().flatten() {
        let input = if call.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                SwarmError::backend(format!(
                    "tool call `{}` has malformed arguments: {}",
                    call.function.name, e
                ))
            })?
        };
        content.push(ContentBlock::ToolUse(ToolUse::new(
            call.id.clone(),
            call.function.name.clone(),
            input,
        )));
    }
    Ok(Message::new(Role::Assistant, content))
}

fn stop_reason_from(finish: Option<FinishReason>, has_tool_uses: bool) -> StopReason {
    match finish {
        Some(FinishReason::ToolCalls) => StopReason::ToolUse,
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        Some(FinishReason::ContentFilter) => StopReason::ContentFiltered,
        Some(FinishReason::FunctionCall) => StopReason::Other("function_call".to_string()),
        None if has_tool_uses => StopReason::ToolUse,
        None => StopReason::EndTurn,
    }
}

/// Map the first choice of a chat completion back into a backend response.
pub(crate) fn parse_chat_response(response: CreateChatCompletionResponse) -> Result<BackendResponse> {
    let usage = response
        .usage
        .as_ref()
        .map(|u| Usage::new(u.prompt_tokens as usize, u.completion_tokens as usize))
        .unwrap_or_default();
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SwarmError::backend("no choices in response"))?;

    let output = message_from_response(&choice.message)?;
    let stop_reason = stop_reason_from(choice.finish_reason, output.has_tool_uses());
    Ok(BackendResponse {
        output,
        stop_reason,
        usage,
    })
}

// =============================
// Scripted backend
// =============================

#[derive(Debug, Clone)]
enum Scripted {
    Response(BackendResponse),
    Error(String),
}

/// Backend that replays scripted responses and records every request.
///
/// Clones share the same script and request log, so a test can keep one
/// handle while the orchestrator owns another. Once the script runs out,
/// every call answers with an `end_turn` text reply.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ConverseRequest>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: BackendResponse) -> Self {
        self.push(Scripted::Response(response));
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(BackendResponse::text(text))
    }

    /// Queue a single tool use with a generated id.
    pub fn with_tool_use(self, name: impl Into<String>, input: Value) -> Self {
        self.with_response(BackendResponse::tool_uses(vec![ToolUse::new(
            new_tool_use_id(),
            name,
            input,
        )]))
    }

    /// Queue one response carrying several tool uses.
    pub fn with_tool_uses(self, uses: Vec<ToolUse>) -> Self {
        self.with_response(BackendResponse::tool_uses(uses))
    }

    /// Queue a backend failure.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Error(message.into()));
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ConverseRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scripted entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(&self, item: Scripted) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
    }
}

fn new_tool_use_id() -> String {
    format!("tooluse_{}", uuid::Uuid::new_v4().simple())
}

#[async_trait]
impl Backend for MockBackend {
    async fn converse(&self, request: ConverseRequest) -> Result<BackendResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Scripted::Response(r)) => Ok(r),
            Some(Scripted::Error(msg)) => Err(SwarmError::backend(msg)),
            None => Ok(BackendResponse::text("Default response")),
        }
    }
}
