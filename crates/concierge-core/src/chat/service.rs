//! Chat service: the turn coordinator for conversations.
//!
//! ChatService owns one conversation turn end to end:
//! 1. Validate input, then persist the user message before any generation.
//! 2. On the first turn, generate the title (cached, collapsed, on a shorter
//!    sub-deadline) concurrently with the reply (tool loop).
//! 3. Reply failure fails the turn and cancels the title; title failure is
//!    logged and the current title kept.
//! 4. Append the assistant message and write the conversation back once. A
//!    failed final write is logged; the reply is still returned.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use uuid::Uuid;

use concierge_types::config::GlobalConfig;
use concierge_types::conversation::{
    ContinuedConversation, Conversation, Message, StartedConversation,
};
use concierge_types::error::ChatError;

use crate::agent::prompt::reply_history;
use crate::agent::title::generate_title;
use crate::agent::tool_loop::{ToolLoop, ToolLoopError};
use crate::chat::repository::ConversationRepository;
use crate::context::TurnContext;
use crate::hash::ContentHasher;
use crate::llm::box_provider::BoxLlmProvider;
use crate::title::{TitleCache, title_cache_key};
use crate::tools::ToolRegistry;

/// Smallest title budget handed out, even when the turn is nearly out of time.
pub const TITLE_BUDGET_FLOOR: Duration = Duration::from_millis(500);

/// Time budgets and model identity for a turn.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub model: String,
    pub request_timeout: Duration,
    pub title_budget_cap: Duration,
    pub title_safety_margin: Duration,
    pub title_prompt_version: String,
    pub max_tool_rounds: usize,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from(&GlobalConfig::default())
    }
}

impl From<&GlobalConfig> for TurnSettings {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            model: config.model.clone(),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            title_budget_cap: Duration::from_millis(config.title_budget_cap_ms),
            title_safety_margin: Duration::from_millis(config.title_safety_margin_ms),
            title_prompt_version: config.title_prompt_version.clone(),
            max_tool_rounds: config.max_tool_rounds,
        }
    }
}

/// Title sub-deadline: `min(cap, remaining - margin)`, or the floor when that is not positive.
pub fn title_budget(remaining: Duration, cap: Duration, margin: Duration) -> Duration {
    match remaining.checked_sub(margin) {
        Some(left) if !left.is_zero() => left.min(cap),
        _ => TITLE_BUDGET_FLOOR,
    }
}

impl From<ToolLoopError> for ChatError {
    fn from(err: ToolLoopError) -> Self {
        match err {
            ToolLoopError::Interrupted(interrupted) => ChatError::Interrupted(interrupted),
            other => ChatError::Generation(other.to_string()),
        }
    }
}

/// Coordinates conversation turns.
///
/// Generic over `ConversationRepository` to maintain clean architecture
/// (concierge-core never depends on concierge-infra).
pub struct ChatService<R> {
    repo: R,
    provider: Arc<BoxLlmProvider>,
    tool_loop: ToolLoop,
    titles: TitleCache,
    hasher: Arc<dyn ContentHasher>,
    settings: TurnSettings,
}

impl<R: ConversationRepository> ChatService<R> {
    pub fn new(
        repo: R,
        provider: Arc<BoxLlmProvider>,
        tools: Arc<ToolRegistry>,
        titles: TitleCache,
        hasher: Arc<dyn ContentHasher>,
        settings: TurnSettings,
    ) -> Self {
        let tool_loop = ToolLoop::new(provider.clone(), tools, settings.model.clone())
            .with_max_rounds(settings.max_tool_rounds);
        Self {
            repo,
            provider,
            tool_loop,
            titles,
            hasher,
            settings,
        }
    }

    /// Start a conversation with `message` and run its first turn.
    #[tracing::instrument(
        name = "start_conversation",
        skip(self, message),
        fields(conversation_id = tracing::field::Empty)
    )]
    pub async fn start_conversation(&self, message: &str) -> Result<StartedConversation, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::MissingArgument("message"));
        }

        let mut conversation = Conversation::start(message);
        tracing::Span::current().record("conversation_id", tracing::field::display(conversation.id));
        let ctx = TurnContext::new(Uuid::now_v7(), self.settings.request_timeout);

        // Persist early so the user's first message survives a failed turn.
        ctx.run(self.repo.create(&conversation)).await??;
        info!(conversation_id = %conversation.id, "conversation created");

        let (reply, title) = self.run_turn(&ctx, &conversation, true).await?;
        if let Some(title) = title {
            conversation.title = title;
        }
        self.finish_turn(&ctx, &mut conversation, &reply).await;

        Ok(StartedConversation {
            conversation_id: conversation.id,
            title: conversation.title,
            reply,
        })
    }

    /// Add `message` to an existing conversation and generate the reply.
    #[tracing::instrument(name = "continue_conversation", skip(self, message))]
    pub async fn continue_conversation(
        &self,
        conversation_id: &str,
        message: &str,
    ) -> Result<ContinuedConversation, ChatError> {
        let id = parse_conversation_id(conversation_id)?;
        if message.trim().is_empty() {
            return Err(ChatError::MissingArgument("message"));
        }

        let ctx = TurnContext::new(Uuid::now_v7(), self.settings.request_timeout);
        let mut conversation = ctx
            .run(self.repo.describe(&id))
            .await??
            .ok_or(ChatError::NotFound)?;

        let user = Message::user(message);
        ctx.run(self.repo.append_message(&id, &user)).await??;
        conversation.push(user);

        let (reply, _) = self.run_turn(&ctx, &conversation, false).await?;
        self.finish_turn(&ctx, &mut conversation, &reply).await;

        Ok(ContinuedConversation { reply })
    }

    /// All conversations, most recently updated first, without messages.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        let mut conversations = self.repo.list().await?;
        for conversation in &mut conversations {
            conversation.messages.clear();
        }
        Ok(conversations)
    }

    /// One conversation with its full message history.
    pub async fn describe_conversation(&self, conversation_id: &str) -> Result<Conversation, ChatError> {
        let id = parse_conversation_id(conversation_id)?;
        self.repo.describe(&id).await?.ok_or(ChatError::NotFound)
    }

    /// Run reply generation, plus title generation on the first turn.
    ///
    /// Returns the reply and, if one was produced, the new title.
    async fn run_turn(
        &self,
        ctx: &TurnContext,
        conversation: &Conversation,
        first_turn: bool,
    ) -> Result<(String, Option<String>), ChatError> {
        let reply = async {
            self.tool_loop
                .run(ctx, reply_history(&conversation.messages))
                .await
                .map_err(ChatError::from)
        };

        if !first_turn {
            let reply = ctx.run(reply).await??;
            return Ok((reply, None));
        }

        let budget = title_budget(
            ctx.remaining(),
            self.settings.title_budget_cap,
            self.settings.title_safety_margin,
        );
        let title_ctx = ctx.child_with_timeout(budget);
        let title = async { Ok::<_, ChatError>(self.title_for(&title_ctx, conversation).await) };

        // try_join! drops the title future as soon as the reply fails.
        match ctx.run(async { tokio::try_join!(title, reply) }).await {
            Ok(Ok((title, reply))) => Ok((reply, title)),
            Ok(Err(e)) => {
                ctx.cancel();
                Err(e)
            }
            Err(interrupted) => {
                ctx.cancel();
                Err(interrupted.into())
            }
        }
    }

    /// Cached title for the conversation. Every failure is logged and swallowed.
    async fn title_for(&self, ctx: &TurnContext, conversation: &Conversation) -> Option<String> {
        let first = conversation.first_user_message().unwrap_or_default();
        let key = title_cache_key(
            self.hasher.as_ref(),
            &self.settings.model,
            &self.settings.title_prompt_version,
            first,
        );

        let provider = self.provider.clone();
        let model = self.settings.model.clone();
        let messages = conversation.messages.clone();
        let result = ctx
            .run(
                self.titles
                    .get_or_compute(&key, move || generate_title(provider, model, messages)),
            )
            .await;

        match result {
            Ok(Ok(title)) if !title.trim().is_empty() => Some(title.trim().to_string()),
            Ok(Ok(_)) => {
                warn!(conversation_id = %conversation.id, "title generation returned empty; keeping current title");
                None
            }
            Ok(Err(e)) => {
                warn!(conversation_id = %conversation.id, error = %e, "title generation failed; keeping current title");
                None
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "title generation abandoned; keeping current title");
                None
            }
        }
    }

    /// Append the assistant reply and write the conversation back once.
    async fn finish_turn(&self, ctx: &TurnContext, conversation: &mut Conversation, reply: &str) {
        conversation.push(Message::assistant(reply));

        let outcome = match ctx.run(self.repo.update(conversation)).await {
            Ok(result) => result.map_err(ChatError::from),
            Err(interrupted) => Err(interrupted.into()),
        };
        match outcome {
            Ok(()) => info!(
                conversation_id = %conversation.id,
                messages = conversation.messages.len(),
                "turn completed"
            ),
            Err(e) => error!(
                conversation_id = %conversation.id,
                error = %e,
                "failed to update conversation; returning reply anyway"
            ),
        }
    }
}

fn parse_conversation_id(raw: &str) -> Result<Uuid, ChatError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ChatError::MissingArgument("conversation_id"));
    }
    Uuid::parse_str(raw).map_err(|_| ChatError::Validation(format!("invalid conversation id '{raw}'")))
}
