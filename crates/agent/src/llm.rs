use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::arguments::ArgumentMap;
use crate::tools::ToolDeclaration;

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned call id, or a synthetic one for providers that do not assign ids.
    pub id: String,
    pub name: String,
    pub args: ArgumentMap,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    Text(String),
    ToolCall(ToolCall),
}

/// One model response: ordered parts mixing text and tool calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelTurn {
    pub parts: Vec<Part>,
}

impl ModelTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self { parts: vec![Part::Text(text.into())] }
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|part| match part {
            Part::ToolCall(call) => Some(call),
            Part::Text(_) => None,
        })
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }

    /// Concatenation of the text parts in order.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                Part::ToolCall(_) => None,
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub output: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    User(String),
    Model(ModelTurn),
    ToolResults(Vec<ToolResult>),
}

/// Everything a provider needs for one round trip; the history is sent in full every time.
#[derive(Clone, Copy, Debug)]
pub struct GenerateRequest<'a> {
    pub system_instruction: &'a str,
    pub declarations: &'a [ToolDeclaration],
    pub history: &'a [Message],
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm transport failure: {message}")]
    Transport { message: String, retryable: bool },
    #[error("llm request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
    #[error("llm returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm response contained no usable candidate")]
    EmptyResponse,
    #[error("llm client is misconfigured: {0}")]
    Configuration(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::EmptyResponse | Self::Configuration(_) => false,
        }
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout { elapsed_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
        } else if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport { retryable: error.is_connect(), message: error.to_string() }
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<ModelTurn, LlmError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 500, max_delay_ms: 8_000 }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries, ..Self::default() }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(exp.min(self.max_delay_ms))
    }

    /// Runs `operation`, retrying retryable failures with exponential backoff.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        event_name = "llm.retry",
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "retrying llm request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
