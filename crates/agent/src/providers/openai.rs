use std::time::Duration;

use async_trait::async_trait;
use copo_core::config::{LlmConfig, LlmProvider};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{http_client, retry_policy, status_error};
use crate::arguments::ArgumentMap;
use crate::llm::{
    GenerateRequest, LlmClient, LlmError, Message, ModelTurn, Part, RetryPolicy, ToolCall,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible `chat/completions` endpoints (OpenAI, Ollama).
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.provider == LlmProvider::OpenAi && config.api_key.is_none() {
            return Err(LlmError::Configuration("openai requires llm.api_key".to_string()));
        }
        let base_url = match (&config.base_url, config.provider) {
            (Some(url), _) => url.clone(),
            (None, LlmProvider::Ollama) => {
                return Err(LlmError::Configuration("ollama requires llm.base_url".to_string()))
            }
            (None, _) => DEFAULT_BASE_URL.to_string(),
        };
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            http: http_client(timeout)?,
            api_key: config.api_key.clone(),
            base_url,
            model: config.model.clone(),
            timeout,
            retry: retry_policy(config),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send_once(&self, body: &Value) -> Result<ModelTurn, LlmError> {
        let mut builder = self.http.post(self.completions_url()).json(body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        let response =
            builder.send().await.map_err(|error| LlmError::from_reqwest(error, self.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let raw = response.text().await.map_err(|error| LlmError::from_reqwest(error, self.timeout))?;
        let parsed: wire::Response =
            serde_json::from_str(&raw).map_err(|error| LlmError::Decode(error.to_string()))?;
        parse_response(parsed)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<ModelTurn, LlmError> {
        let body = serde_json::to_value(build_request(&self.model, request))
            .map_err(|error| LlmError::Decode(error.to_string()))?;
        debug!(history = request.history.len(), "sending chat completions request");
        self.retry.run(|| self.send_once(&body)).await
    }
}

fn build_request<'a>(model: &'a str, request: &GenerateRequest<'a>) -> wire::Request<'a> {
    let mut messages = Vec::with_capacity(request.history.len() + 1);
    if !request.system_instruction.is_empty() {
        messages.push(wire::Message::plain("system", request.system_instruction));
    }

    for message in request.history {
        match message {
            Message::User(text) => messages.push(wire::Message::plain("user", text)),
            Message::Model(turn) => {
                let text = turn.joined_text();
                let tool_calls = turn
                    .tool_calls()
                    .map(|call| wire::ToolCall {
                        id: call.id.clone(),
                        call_type: "function".to_string(),
                        function: wire::FunctionCall {
                            name: call.name.clone(),
                            arguments: call.args.to_json().to_string(),
                        },
                    })
                    .collect::<Vec<_>>();
                messages.push(wire::Message {
                    role: "assistant",
                    content: (!text.is_empty()).then_some(text),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                    tool_call_id: None,
                });
            }
            Message::ToolResults(results) => {
                messages.extend(results.iter().map(|result| wire::Message {
                    role: "tool",
                    content: Some(result.output.clone()),
                    tool_calls: None,
                    tool_call_id: Some(result.call_id.clone()),
                }));
            }
        }
    }

    let tools = request
        .declarations
        .iter()
        .map(|declaration| wire::Tool {
            tool_type: "function",
            function: wire::FunctionDef {
                name: declaration.name,
                description: declaration.description,
                parameters: declaration.parameters.to_json_schema(),
            },
        })
        .collect();

    wire::Request { model, messages, tools }
}

fn parse_response(response: wire::Response) -> Result<ModelTurn, LlmError> {
    let choice = response.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
    let mut parts = Vec::new();
    if let Some(content) = choice.message.content.filter(|content| !content.is_empty()) {
        parts.push(Part::Text(content));
    }

    for call in choice.message.tool_calls.unwrap_or_default() {
        let args = match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(value) => ArgumentMap::from_json(value),
            Err(error) => {
                warn!(tool = %call.function.name, error = %error, "tool call arguments are not valid JSON");
                ArgumentMap::default()
            }
        };
        parts.push(Part::ToolCall(ToolCall { id: call.id, name: call.function.name, args }));
    }

    Ok(ModelTurn { parts })
}

mod wire {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Serialize)]
    pub(super) struct Request<'a> {
        pub model: &'a str,
        pub messages: Vec<Message>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub tools: Vec<Tool<'a>>,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct Message {
        pub role: &'static str,
        pub content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_calls: Option<Vec<ToolCall>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_call_id: Option<String>,
    }

    impl Message {
        pub fn plain(role: &'static str, content: &str) -> Self {
            Self { role, content: Some(content.to_string()), tool_calls: None, tool_call_id: None }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct ToolCall {
        pub id: String,
        #[serde(rename = "type", default = "function_type")]
        pub call_type: String,
        pub function: FunctionCall,
    }

    fn function_type() -> String {
        "function".to_string()
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct FunctionCall {
        pub name: String,
        /// JSON-encoded argument object.
        #[serde(default)]
        pub arguments: String,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct Tool<'a> {
        #[serde(rename = "type")]
        pub tool_type: &'static str,
        pub function: FunctionDef<'a>,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct FunctionDef<'a> {
        pub name: &'a str,
        pub description: &'a str,
        pub parameters: Value,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Response {
        #[serde(default)]
        pub choices: Vec<Choice>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Choice {
        pub message: ResponseMessage,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ResponseMessage {
        pub content: Option<String>,
        pub tool_calls: Option<Vec<ToolCall>>,
    }
}
