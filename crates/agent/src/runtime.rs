use std::sync::Arc;

use copo_core::catalog::Catalog;
use copo_core::config::AgentConfig;
use copo_core::errors::ApplicationError;
use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::conversation::ConversationSession;
use crate::dispatcher::ToolDispatcher;
use crate::llm::{LlmClient, LlmError, ModelTurn, ToolResult};
use crate::prompts;
use crate::tools::ToolRegistry;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model round trip failed: {0}")]
    Model(#[from] LlmError),
    #[error("conversation exceeded the limit of {limit} tool turns")]
    TurnLimitExceeded { limit: u32 },
}

impl From<AgentError> for ApplicationError {
    fn from(value: AgentError) -> Self {
        Self::Integration(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    pub system_prompt: String,
    pub max_tool_turns: u32,
}

impl AgentSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            system_prompt: prompts::system_prompt(config.system_prompt.as_deref()).to_string(),
            max_tool_turns: config.max_tool_turns,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentAnswer {
    pub text: String,
    pub round_trips: u32,
    pub tool_turns: u32,
}

/// Drives one conversation per query: model round trips alternate with tool dispatch until
/// the model answers without requesting tools.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    dispatcher: ToolDispatcher,
    catalog: Arc<dyn Catalog>,
    settings: AgentSettings,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        catalog: Arc<dyn Catalog>,
        settings: AgentSettings,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(registry.clone());
        Self { llm, registry, dispatcher, catalog, settings }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn provider_name(&self) -> &'static str {
        self.llm.provider_name()
    }

    #[instrument(skip(self, query), fields(provider = self.llm.provider_name()))]
    pub async fn handle_query(
        &self,
        query: &str,
        correlation_id: &str,
    ) -> Result<AgentAnswer, AgentError> {
        let mut session = ConversationSession::start(
            &self.settings.system_prompt,
            self.registry.declarations(),
            query,
        );

        loop {
            let turn = self.llm.generate(&session.request()).await.map_err(|cause| {
                error!(
                    event_name = "agent.model_failed",
                    correlation_id,
                    round_trip = session.round_trips() + 1,
                    error = %cause,
                    "model round trip failed"
                );
                AgentError::Model(cause)
            })?;
            session.record_model_turn(turn);

            let calls = session.inspect();
            if calls.is_empty() {
                break;
            }
            if session.tool_turns() > self.settings.max_tool_turns {
                error!(
                    event_name = "agent.turn_limit",
                    correlation_id,
                    limit = self.settings.max_tool_turns,
                    "model kept requesting tools"
                );
                return Err(AgentError::TurnLimitExceeded { limit: self.settings.max_tool_turns });
            }

            info!(
                event_name = "agent.tools_requested",
                correlation_id,
                tool_turn = session.tool_turns(),
                tools = ?calls.iter().map(|call| call.name.as_str()).collect::<Vec<_>>(),
                "dispatching tool calls"
            );
            let catalog = self.catalog.as_ref();
            let outputs =
                join_all(calls.iter().map(|call| self.dispatcher.invoke(call, catalog))).await;
            let results = calls
                .into_iter()
                .zip(outputs)
                .map(|(call, output)| ToolResult { call_id: call.id, name: call.name, output })
                .collect();
            session.record_tool_results(results);
        }

        let text = session.last_model_turn().map(ModelTurn::joined_text).unwrap_or_default();
        info!(
            event_name = "agent.answered",
            correlation_id,
            round_trips = session.round_trips(),
            tool_turns = session.tool_turns(),
            answer_chars = text.chars().count(),
            "conversation finished"
        );
        Ok(AgentAnswer { text, round_trips: session.round_trips(), tool_turns: session.tool_turns() })
    }
}
