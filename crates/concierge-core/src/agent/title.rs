//! Conversation title generation via LLM.
//!
//! `generate_title` makes a single model call (no tools) over the whole
//! conversation and returns the raw title text. Normalization and caching
//! happen in [`crate::title::TitleCache`].

use std::sync::Arc;

use tracing::Instrument;

use concierge_types::conversation::Message as StoredMessage;
use concierge_types::llm::CompletionRequest;

use crate::llm::box_provider::BoxLlmProvider;
use crate::title::TitleError;

use super::prompt::{TITLE_SYSTEM_PROMPT, title_history};

/// Title used when there is nothing to summarize.
pub const EMPTY_CONVERSATION_TITLE: &str = "An empty conversation";

/// Generate a title for a conversation.
///
/// An empty conversation gets [`EMPTY_CONVERSATION_TITLE`] without a model
/// call. A response with no choices or only whitespace is an error.
#[tracing::instrument(
    name = "generate_title",
    skip(provider, model, messages),
    fields(model = %model, message_count = messages.len())
)]
pub async fn generate_title(
    provider: Arc<BoxLlmProvider>,
    model: String,
    messages: Vec<StoredMessage>,
) -> Result<String, TitleError> {
    if messages.is_empty() {
        return Ok(EMPTY_CONVERSATION_TITLE.to_string());
    }

    let request = CompletionRequest {
        model: model.clone(),
        messages: title_history(&messages),
        system: Some(TITLE_SYSTEM_PROMPT.to_string()),
        tools: Vec::new(),
        max_tokens: None,
        temperature: None,
    };

    let span = tracing::info_span!(
        "gen_ai.title",
        gen_ai.system = provider.name(),
        gen_ai.request.model = %request.model,
        gen_ai.operation.name = "chat",
    );

    let response = provider
        .complete(&request)
        .instrument(span)
        .await
        .map_err(|e| TitleError::Llm(e.to_string()))?;

    match response.choices.into_iter().next() {
        Some(choice) if !choice.content.trim().is_empty() => Ok(choice.content),
        _ => Err(TitleError::EmptyResponse),
    }
}
