use std::time::Duration;

use async_trait::async_trait;
use copo_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use super::{http_client, retry_policy, status_error};
use crate::arguments::ArgumentMap;
use crate::llm::{
    GenerateRequest, LlmClient, LlmError, Message, ModelTurn, Part, RetryPolicy, ToolCall,
};
use crate::tools::{ParamType, ParameterSchema, ToolDeclaration};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Configuration("gemini requires llm.api_key".to_string()))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            base_url: config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            timeout,
            retry: retry_policy(config),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn send_once(&self, body: &Value) -> Result<ModelTurn, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| LlmError::from_reqwest(error, self.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let raw = response.text().await.map_err(|error| LlmError::from_reqwest(error, self.timeout))?;
        let parsed: wire::GenerateContentResponse =
            serde_json::from_str(&raw).map_err(|error| LlmError::Decode(error.to_string()))?;
        parse_response(parsed)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<ModelTurn, LlmError> {
        let body = serde_json::to_value(build_request(request))
            .map_err(|error| LlmError::Decode(error.to_string()))?;
        debug!(history = request.history.len(), "sending gemini generateContent request");
        self.retry.run(|| self.send_once(&body)).await
    }
}

fn build_request(request: &GenerateRequest<'_>) -> wire::GenerateContentRequest {
    let contents = request.history.iter().map(to_content).collect();
    let tools = if request.declarations.is_empty() {
        Vec::new()
    } else {
        vec![wire::Tool {
            function_declarations: request.declarations.iter().map(to_function_declaration).collect(),
        }]
    };

    wire::GenerateContentRequest {
        system_instruction: (!request.system_instruction.is_empty())
            .then(|| wire::Content::system(request.system_instruction)),
        contents,
        tools,
    }
}

fn to_content(message: &Message) -> wire::Content {
    match message {
        Message::User(text) => wire::Content {
            role: Some("user".to_string()),
            parts: vec![wire::Part::text(text)],
        },
        Message::Model(turn) => wire::Content {
            role: Some("model".to_string()),
            parts: turn
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => wire::Part::text(text),
                    Part::ToolCall(call) => wire::Part {
                        function_call: Some(wire::FunctionCall {
                            name: call.name.clone(),
                            args: call.args.to_json(),
                        }),
                        ..wire::Part::default()
                    },
                })
                .collect(),
        },
        Message::ToolResults(results) => wire::Content {
            role: Some("user".to_string()),
            parts: results
                .iter()
                .map(|result| wire::Part {
                    function_response: Some(wire::FunctionResponse {
                        name: result.name.clone(),
                        response: json!({ "result": result.output }),
                    }),
                    ..wire::Part::default()
                })
                .collect(),
        },
    }
}

fn to_function_declaration(declaration: &ToolDeclaration) -> Value {
    json!({
        "name": declaration.name,
        "description": declaration.description,
        "parameters": schema_to_gemini(&declaration.parameters),
        "response": { "type": type_name(declaration.response_type) },
    })
}

/// Gemini schemas use the upper-case OpenAPI type names.
fn schema_to_gemini(schema: &ParameterSchema) -> Value {
    let mut object = Map::new();
    object.insert("type".to_string(), json!("OBJECT"));
    if schema.properties.is_empty() {
        return Value::Object(object);
    }

    let properties = schema
        .properties
        .iter()
        .map(|spec| {
            let mut property = json!({
                "type": type_name(spec.param_type),
                "description": spec.description,
            });
            if spec.param_type == ParamType::StringArray {
                property["items"] = json!({ "type": "STRING" });
            }
            (spec.name.to_string(), property)
        })
        .collect::<Map<_, _>>();
    object.insert("properties".to_string(), Value::Object(properties));
    object.insert("required".to_string(), json!(schema.required_names()));
    Value::Object(object)
}

fn type_name(param_type: ParamType) -> &'static str {
    match param_type {
        ParamType::String => "STRING",
        ParamType::StringArray => "ARRAY",
    }
}

fn parse_response(response: wire::GenerateContentResponse) -> Result<ModelTurn, LlmError> {
    let candidate = response.candidates.into_iter().next().ok_or(LlmError::EmptyResponse)?;
    let parts = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, part)| {
            if let Some(call) = part.function_call {
                Some(Part::ToolCall(ToolCall {
                    id: format!("{}-{index}", call.name),
                    name: call.name,
                    args: ArgumentMap::from_json(call.args),
                }))
            } else {
                part.text.map(Part::Text)
            }
        })
        .collect::<Vec<_>>();

    if parts.is_empty() {
        if let Some(reason) = candidate.finish_reason.as_deref().filter(|reason| *reason != "STOP") {
            warn!(finish_reason = reason, "gemini candidate finished without content");
            return Err(LlmError::EmptyResponse);
        }
    }
    Ok(ModelTurn { parts })
}

mod wire {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerateContentRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub system_instruction: Option<Content>,
        pub contents: Vec<Content>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub tools: Vec<Tool>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Tool {
        pub function_declarations: Vec<Value>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub(super) struct Content {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub role: Option<String>,
        #[serde(default)]
        pub parts: Vec<Part>,
    }

    impl Content {
        pub fn system(text: &str) -> Self {
            Self { role: None, parts: vec![Part::text(text)] }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Part {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub function_call: Option<FunctionCall>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub function_response: Option<FunctionResponse>,
    }

    impl Part {
        pub fn text(text: &str) -> Self {
            Self { text: Some(text.to_string()), ..Self::default() }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct FunctionCall {
        pub name: String,
        #[serde(default)]
        pub args: Value,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct FunctionResponse {
        pub name: String,
        pub response: Value,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerateContentResponse {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct Candidate {
        pub content: Option<Content>,
        pub finish_reason: Option<String>,
    }
}
