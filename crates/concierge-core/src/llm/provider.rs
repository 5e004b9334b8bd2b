//! LlmProvider trait definition.
//!
//! This is the core abstraction that all LLM providers implement.
//! Uses RPITIT for `complete`; `BoxLlmProvider` adds dynamic dispatch.

use concierge_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends (OpenAI and compatible servers).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Dropping the
/// returned future abandons the request, which is how turn cancellation and
/// deadlines reach the provider.
///
/// Implementations live in concierge-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive every returned choice.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
