use crate::llm::{GenerateRequest, Message, ModelTurn, ToolCall, ToolResult};
use crate::tools::ToolDeclaration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    AwaitingModel,
    InspectingTurn,
    DispatchingTools,
    Done,
}

/// History of one user query. Created per request and dropped once the answer is extracted.
#[derive(Debug)]
pub struct ConversationSession<'a> {
    system_instruction: &'a str,
    declarations: &'a [ToolDeclaration],
    history: Vec<Message>,
    state: SessionState,
    round_trips: u32,
    tool_turns: u32,
}

impl<'a> ConversationSession<'a> {
    pub fn start(
        system_instruction: &'a str,
        declarations: &'a [ToolDeclaration],
        user_query: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction,
            declarations,
            history: vec![Message::User(user_query.into())],
            state: SessionState::AwaitingModel,
            round_trips: 0,
            tool_turns: 0,
        }
    }

    pub fn request(&self) -> GenerateRequest<'_> {
        GenerateRequest {
            system_instruction: self.system_instruction,
            declarations: self.declarations,
            history: &self.history,
        }
    }

    pub fn record_model_turn(&mut self, turn: ModelTurn) {
        self.round_trips += 1;
        self.history.push(Message::Model(turn));
        self.state = SessionState::InspectingTurn;
    }

    /// Returns the tool calls of the latest model turn, in order, and moves to tool dispatch
    /// when there are any or to done when there are none.
    pub fn inspect(&mut self) -> Vec<ToolCall> {
        let calls = self
            .last_model_turn()
            .map(|turn| turn.tool_calls().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        self.state = if calls.is_empty() {
            SessionState::Done
        } else {
            self.tool_turns += 1;
            SessionState::DispatchingTools
        };
        calls
    }

    /// Answers every call of the latest turn; the results must be in call order.
    pub fn record_tool_results(&mut self, results: Vec<ToolResult>) {
        self.history.push(Message::ToolResults(results));
        self.state = SessionState::AwaitingModel;
    }

    /// Most recent model turn.
    pub fn last_model_turn(&self) -> Option<&ModelTurn> {
        self.history.iter().rev().find_map(|message| match message {
            Message::Model(turn) => Some(turn),
            _ => None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn round_trips(&self) -> u32 {
        self.round_trips
    }

    pub fn tool_turns(&self) -> u32 {
        self.tool_turns
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }
}
