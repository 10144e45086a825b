use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use copo_agent::AgentRuntime;
use copo_core::errors::{ApplicationError, DomainError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::formatter::ResponseFormatter;

pub const COMPLETION_ID_PREFIX: &str = "chatcmpl-custom-";

#[derive(Clone)]
pub struct ChatState {
    runtime: Arc<AgentRuntime>,
    formatter: Arc<ResponseFormatter>,
    model: String,
}

impl ChatState {
    pub fn new(
        runtime: Arc<AgentRuntime>,
        formatter: Arc<ResponseFormatter>,
        model: impl Into<String>,
    ) -> Self {
        Self { runtime, formatter, model: model.into() }
    }
}

// OpenAI chat completions subset. Only the content of the last message is read.

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
}

/// Always zero-filled; token counts are not tracked.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub correlation_id: String,
}

pub fn router(state: ChatState) -> Router {
    Router::new().route("/v1/chat/completions", post(chat_completions)).with_state(state)
}

pub async fn chat_completions(
    State(state): State<ChatState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let completion_id = format!("{COMPLETION_ID_PREFIX}{}", Uuid::new_v4());

    let Some(query) = request.messages.last().map(|message| message.content.as_str()) else {
        info!(
            event_name = "http.chat.rejected",
            correlation_id = %completion_id,
            "chat request without messages"
        );
        return Err(error_response(
            ApplicationError::from(DomainError::EmptyConversation).into_interface(&completion_id),
        ));
    };

    info!(
        event_name = "http.chat.received",
        correlation_id = %completion_id,
        messages = request.messages.len(),
        requested_model = request.model.as_deref().unwrap_or("unspecified"),
        "chat completion requested"
    );

    let answer = state.runtime.handle_query(query, &completion_id).await.map_err(|cause| {
        error!(
            event_name = "http.chat.failed",
            correlation_id = %completion_id,
            error = %cause,
            "conversation failed"
        );
        error_response(ApplicationError::from(cause).into_interface(&completion_id))
    })?;

    let content = state.formatter.format(&answer.text).map_err(|cause| {
        error!(
            event_name = "http.chat.format_failed",
            correlation_id = %completion_id,
            error = %cause,
            "response template could not be rendered"
        );
        error_response(
            ApplicationError::Configuration(cause.to_string()).into_interface(&completion_id),
        )
    })?;

    info!(
        event_name = "http.chat.completed",
        correlation_id = %completion_id,
        round_trips = answer.round_trips,
        tool_turns = answer.tool_turns,
        "chat completion answered"
    );

    Ok(Json(ChatCompletionResponse {
        id: completion_id,
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model: state.model.clone(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage { role: "assistant".to_string(), content },
        }],
        usage: Usage::default(),
    }))
}

fn error_response(error: InterfaceError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, error_type) = match error {
        InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request_error"),
        InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        }
    };

    let body = ErrorResponse {
        error: ErrorDetail {
            message: error.user_message().to_string(),
            error_type: error_type.to_string(),
            correlation_id: error.correlation_id().to_string(),
        },
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use copo_agent::arguments::ArgumentMap;
    use copo_agent::llm::{LlmError, Message, ModelTurn, Part, ToolCall};
    use copo_agent::mock::ScriptedLlmClient;
    use copo_agent::{AgentRuntime, AgentSettings, ToolRegistry};
    use copo_core::config::ResponseConfig;
    use copo_db::{demo_products, InMemoryCatalog};
    use serde_json::json;

    use super::{chat_completions, ChatCompletionRequest, ChatMessage, ChatState, Usage};
    use crate::formatter::ResponseFormatter;

    fn state(llm: Arc<ScriptedLlmClient>) -> ChatState {
        let runtime = AgentRuntime::new(
            llm,
            Arc::new(ToolRegistry::product_catalog().expect("registry")),
            Arc::new(InMemoryCatalog::with_products(demo_products())),
            AgentSettings { system_prompt: "Eres un asistente.".to_string(), max_tool_turns: 4 },
        );
        let formatter = ResponseFormatter::new(&ResponseConfig {
            header: "ENCABEZADO".to_string(),
            footer: "PIE".to_string(),
        })
        .expect("formatter");
        ChatState::new(Arc::new(runtime), Arc::new(formatter), "gemini-2.0-flash")
    }

    fn request(contents: &[&str]) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: Some("gpt-4".to_string()),
            messages: contents
                .iter()
                .map(|content| ChatMessage { role: "user".to_string(), content: content.to_string() })
                .collect(),
        }
    }

    #[tokio::test]
    async fn brands_question_returns_formatted_completion() {
        let llm = Arc::new(ScriptedLlmClient::new([
            Ok(ModelTurn {
                parts: vec![Part::ToolCall(ToolCall {
                    id: "c1".to_string(),
                    name: "obtenerListaProductos".to_string(),
                    args: ArgumentMap::default(),
                })],
            }),
            Ok(ModelTurn::text("Manejamos ZWAN y SUKARNE.")),
        ]));

        let Json(response) =
            chat_completions(State(state(llm.clone())), Json(request(&["¿Qué marcas manejan?"])))
                .await
                .expect("completion");

        assert!(response.id.starts_with("chatcmpl-custom-"));
        assert_eq!(response.object, "chat.completion");
        assert_eq!(response.model, "gemini-2.0-flash");
        assert!(response.created > 0);
        assert_eq!(response.usage, Usage::default());
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].index, 0);
        assert_eq!(response.choices[0].message.role, "assistant");
        assert_eq!(response.choices[0].message.content, "ENCABEZADO\n\nManejamos ZWAN y SUKARNE.\n\nPIE");
        assert_eq!(llm.request_count(), 2);
    }

    #[tokio::test]
    async fn only_last_message_is_sent_to_the_model() {
        let llm = Arc::new(ScriptedLlmClient::new([Ok(ModelTurn::text("Hola"))]));

        chat_completions(State(state(llm.clone())), Json(request(&["primero", "segundo"])))
            .await
            .expect("completion");

        let requests = llm.requests();
        assert_eq!(requests[0].history.len(), 1);
        assert!(matches!(&requests[0].history[0], Message::User(text) if text == "segundo"));
    }

    #[tokio::test]
    async fn empty_messages_are_rejected_without_calling_the_model() {
        let llm = Arc::new(ScriptedLlmClient::default());

        let (status, Json(body)) =
            chat_completions(State(state(llm.clone())), Json(request(&[]))).await.expect_err("400");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.error_type, "invalid_request_error");
        assert!(body.error.correlation_id.starts_with("chatcmpl-custom-"));
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn model_failure_returns_generic_server_error() {
        let llm = Arc::new(ScriptedLlmClient::new([Err(LlmError::Status {
            status: 401,
            body: "API key not valid".to_string(),
        })]));

        let (status, Json(body)) =
            chat_completions(State(state(llm)), Json(request(&["hola"]))).await.expect_err("500");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.error_type, "server_error");
        let rendered = json!(body).to_string();
        assert!(!rendered.contains("API key"));
        assert!(!body.error.message.contains("401"));
    }
}
