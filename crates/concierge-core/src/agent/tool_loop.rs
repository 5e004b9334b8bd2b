//! Bounded tool-calling loop that drives the model to a final reply.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! AwaitingModel(1) -> DispatchingTools(1) -> AwaitingModel(2) -> ... -> Done
//!                 \-> Failed                              \-> Failed
//! ```
//!
//! Every round sends the full history plus the tool declarations. A response
//! with tool calls moves to `DispatchingTools`; a response without them ends
//! the loop. Tool failures are fed back to the model as text, while provider
//! errors, empty responses, unknown tool names and round exhaustion fail the
//! loop.

use std::sync::Arc;

use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};

use concierge_types::error::Interrupted;
use concierge_types::llm::{Choice, CompletionRequest, LlmError, Message, ToolCall};

use crate::context::TurnContext;
use crate::llm::box_provider::BoxLlmProvider;
use crate::tools::ToolRegistry;

use super::prompt::REPLY_SYSTEM_PROMPT;

/// Default bound on model rounds per reply.
pub const DEFAULT_MAX_ROUNDS: usize = 15;

/// Fatal tool loop failures. Each one aborts the turn.
#[derive(Debug, Error)]
pub enum ToolLoopError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("no choices returned by the model")]
    NoChoices,

    #[error("unknown tool call: {0}")]
    UnknownTool(String),

    #[error("too many tool calls ({rounds} rounds), unable to generate reply")]
    TooManyToolCalls { rounds: usize },

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

#[derive(Debug)]
enum LoopState {
    AwaitingModel { round: usize },
    DispatchingTools { round: usize, calls: Vec<ToolCall> },
    Done(String),
    Failed(ToolLoopError),
}

/// Drives one reply through the model and the tool registry.
#[derive(Debug, Clone)]
pub struct ToolLoop {
    provider: Arc<BoxLlmProvider>,
    tools: Arc<ToolRegistry>,
    model: String,
    max_rounds: usize,
}

impl ToolLoop {
    pub fn new(provider: Arc<BoxLlmProvider>, tools: Arc<ToolRegistry>, model: impl Into<String>) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Run the loop over `history` (prior turns, oldest first) until the model answers.
    ///
    /// Every provider and tool call is bounded by `ctx`.
    pub async fn run(&self, ctx: &TurnContext, history: Vec<Message>) -> Result<String, ToolLoopError> {
        let mut messages = history;
        let mut state = LoopState::AwaitingModel { round: 1 };

        loop {
            state = match state {
                LoopState::AwaitingModel { round } if round > self.max_rounds => {
                    LoopState::Failed(ToolLoopError::TooManyToolCalls {
                        rounds: self.max_rounds,
                    })
                }
                LoopState::AwaitingModel { round } => match self.ask_model(ctx, &messages, round).await {
                    Ok(choice) if choice.tool_calls.is_empty() => {
                        debug!(round, content_length = choice.content.len(), "model answered without tools");
                        LoopState::Done(choice.content)
                    }
                    Ok(choice) => {
                        info!(round, count = choice.tool_calls.len(), "tool calls requested");
                        let calls = choice.tool_calls.clone();
                        messages.push(Message::assistant_tool_calls(choice.content, choice.tool_calls));
                        LoopState::DispatchingTools { round, calls }
                    }
                    Err(e) => LoopState::Failed(e),
                },
                LoopState::DispatchingTools { round, calls } => {
                    match self.dispatch(ctx, &calls, &mut messages).await {
                        Ok(()) => LoopState::AwaitingModel { round: round + 1 },
                        Err(e) => LoopState::Failed(e),
                    }
                }
                LoopState::Done(reply) => return Ok(reply),
                LoopState::Failed(e) => {
                    warn!(error = %e, "tool loop failed");
                    return Err(e);
                }
            };
        }
    }

    async fn ask_model(
        &self,
        ctx: &TurnContext,
        messages: &[Message],
        round: usize,
    ) -> Result<Choice, ToolLoopError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            system: Some(REPLY_SYSTEM_PROMPT.to_string()),
            tools: self.tools.definitions(),
            max_tokens: None,
            temperature: None,
        };

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.operation.name = "chat",
            round,
        );

        let response = ctx
            .run(self.provider.complete(&request).instrument(span))
            .await??;

        response.choices.into_iter().next().ok_or(ToolLoopError::NoChoices)
    }

    /// Execute each call in order, appending one tool-result message per call.
    async fn dispatch(
        &self,
        ctx: &TurnContext,
        calls: &[ToolCall],
        messages: &mut Vec<Message>,
    ) -> Result<(), ToolLoopError> {
        for call in calls {
            let tool = self
                .tools
                .get(&call.name)
                .ok_or_else(|| ToolLoopError::UnknownTool(call.name.clone()))?;

            info!(tool = %call.name, args = %call.arguments, "tool call received");

            let content = match ctx.run(tool.execute(&call.arguments)).await? {
                Ok(output) => output,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool call failed; reporting to model");
                    e.to_string()
                }
            };
            messages.push(Message::tool_result(call.id.clone(), content));
        }
        Ok(())
    }
}
