//! OpenAI-compatible chat-completions backend.
//!
//! Implements the [`Backend`] port over any endpoint speaking the OpenAI
//! chat-completions protocol (OpenAI, Deepseek, OpenRouter, local gateways).
//! `call_agent` runs a bounded tool-call loop: while the model keeps asking
//! for tools, the adapter executes them and feeds the results back, then
//! returns the first terminal text. A reply that refuses to proceed surfaces
//! as [`BackendError::Escalated`]; a reply with neither content nor tool
//! calls, or an exhausted tool budget, surfaces as
//! [`BackendError::NoFinalResponse`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use fai_core::{Backend, BackendError, RunnerHandle, RunnerSpec, Tool};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::RemoteBackendConfig;

const SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// HTTP backend over an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiBackend {
    config: RemoteBackendConfig,
    client: Client,
    session: AtomicBool,
}

impl OpenAiBackend {
    /// Create a backend with the given configuration.
    pub fn new(config: RemoteBackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| BackendError::Configuration(err.to_string()))?;
        Ok(Self { config, client, session: AtomicBool::new(false) })
    }

    fn find_tool<'a>(spec: &'a RunnerSpec, name: &str) -> Option<&'a Arc<Tool>> {
        spec.tools.iter().find(|tool| tool.name() == name)
    }

    async fn post_chat(&self, body: &ChatRequest<'_>) -> Result<ChatResponse, BackendError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::Request(format!("API error {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|err| BackendError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn create_session(&self) -> Result<(), BackendError> {
        self.session.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn create_runner(&self, spec: RunnerSpec) -> Result<RunnerHandle, BackendError> {
        if spec.model.is_empty() {
            return Err(BackendError::Configuration("model must not be empty".into()));
        }
        Ok(RunnerHandle::new(spec))
    }

    async fn call_agent(&self, prompt: &str, runner: &RunnerHandle) -> Result<String, BackendError> {
        if !self.session.load(Ordering::SeqCst) {
            return Err(BackendError::SessionMissing);
        }

        let spec = runner.spec();
        let tool_defs = tool_definitions(spec);
        let response_format = spec.output_schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": { "name": "result", "schema": schema }
            })
        });

        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        // One extra round so a final text reply after the last tool round
        // still gets through.
        for round in 0..=self.config.max_tool_rounds {
            let body = ChatRequest {
                model: &spec.model,
                messages: &messages,
                tools: tool_defs.as_deref(),
                response_format: response_format.as_ref(),
            };
            let reply = self.post_chat(&body).await?;

            let choice = reply
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| BackendError::InvalidResponse("empty choices".into()))?;
            let message = choice.message;

            if let Some(refusal) = message.refusal {
                return Err(BackendError::Escalated(refusal));
            }

            let tool_calls = message.tool_calls.unwrap_or_default();
            if tool_calls.is_empty() {
                return match message.content {
                    Some(content) => Ok(content),
                    None => Err(BackendError::NoFinalResponse),
                };
            }

            debug!(round, calls = tool_calls.len(), "executing tool calls");
            messages.push(ChatMessage::assistant_tool_calls(tool_calls.clone()));

            for call in tool_calls {
                let tool = Self::find_tool(spec, &call.function.name).ok_or_else(|| {
                    fai_core::ToolError::NotFound { tool: call.function.name.clone() }
                })?;
                let arguments: Value =
                    serde_json::from_str(&call.function.arguments).map_err(|err| {
                        fai_core::ToolError::InvalidArguments {
                            tool: call.function.name.clone(),
                            error: err.to_string(),
                        }
                    })?;
                let result = tool.execute(arguments).await?;
                messages.push(ChatMessage::tool_result(call.id, result.to_string()));
            }
        }

        Err(BackendError::NoFinalResponse)
    }
}

fn tool_definitions(spec: &RunnerSpec) -> Option<Vec<Value>> {
    if spec.tools.is_empty() {
        return None;
    }
    Some(
        spec.tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name(),
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    }
                })
            })
            .collect(),
    )
}

// Chat-completions wire types.

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a Value>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self { role: "system", content: Some(content.to_string()), tool_calls: None, tool_call_id: None }
    }

    fn user(content: &str) -> Self {
        Self { role: "user", content: Some(content.to_string()), tool_calls: None, tool_call_id: None }
    }

    fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self { role: "assistant", content: None, tool_calls: Some(tool_calls), tool_call_id: None }
    }

    fn tool_result(call_id: String, content: String) -> Self {
        Self { role: "tool", content: Some(content), tool_calls: None, tool_call_id: Some(call_id) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    refusal: Option<String>,
}
