//! Tool-calling conversation runtime for product catalog questions.
//!
//! A user query opens a [`conversation::ConversationSession`]; the [`runtime::AgentRuntime`]
//! sends it to the configured [`llm::LlmClient`], answers every tool call of each model turn
//! through the [`dispatcher::ToolDispatcher`], and stops at the first turn without calls.
//!
//! The model never reads the catalog directly. It can only request one of the tools in the
//! [`tools::ToolRegistry`], whose handlers return plain strings.

pub mod arguments;
pub mod conversation;
pub mod dispatcher;
pub mod llm;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod prompts;
pub mod providers;
pub mod runtime;
pub mod tools;

pub use llm::{LlmClient, LlmError, ModelTurn, RetryPolicy};
pub use runtime::{AgentAnswer, AgentError, AgentRuntime, AgentSettings};
pub use tools::{ToolKind, ToolRegistry};
