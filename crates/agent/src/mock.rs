use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{GenerateRequest, LlmClient, LlmError, Message, ModelTurn};

/// Request as seen by [`ScriptedLlmClient`], copied out of the borrowed [`GenerateRequest`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub system_instruction: String,
    pub declaration_names: Vec<&'static str>,
    pub history: Vec<Message>,
}

/// LLM client that replays queued turns in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedLlmClient {
    turns: Mutex<VecDeque<Result<ModelTurn, LlmError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(turns: impl IntoIterator<Item = Result<ModelTurn, LlmError>>) -> Self {
        Self { turns: Mutex::new(turns.into_iter().collect()), requests: Mutex::default() }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<ModelTurn, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                system_instruction: request.system_instruction.to_string(),
                declaration_names: request.declarations.iter().map(|decl| decl.name).collect(),
                history: request.history.to_vec(),
            });
        }

        self.turns
            .lock()
            .ok()
            .and_then(|mut turns| turns.pop_front())
            .unwrap_or_else(|| Err(LlmError::Decode("scripted client ran out of turns".to_string())))
    }
}
