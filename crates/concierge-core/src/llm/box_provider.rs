//! BoxLlmProvider: a type-erased handle over any [`LlmProvider`].
//!
//! `LlmProvider::complete` returns `impl Future`, which rules out
//! `dyn LlmProvider`. [`ErasedProvider`] is the object-safe mirror with a boxed
//! future, implemented for every provider, and `BoxLlmProvider` owns one.

use std::future::Future;
use std::pin::Pin;

use concierge_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::LlmProvider;

/// Boxed completion future.
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

/// Object-safe mirror of [`LlmProvider`].
pub trait ErasedProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

impl<P: LlmProvider> ErasedProvider for P {
    fn provider_name(&self) -> &str {
        self.name()
    }

    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(self.complete(request))
    }
}

/// The model backend chosen at startup. Shared by the tool loop and title generation.
pub struct BoxLlmProvider {
    inner: Box<dyn ErasedProvider>,
}

impl BoxLlmProvider {
    pub fn new<P: LlmProvider + 'static>(provider: P) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.provider_name()
    }

    /// One model call. Returns every choice the provider produced.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.inner.complete_erased(request).await
    }
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxLlmProvider").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use concierge_types::llm::{Choice, Message, StopReason, Usage};

    use super::*;

    struct Echo;

    impl LlmProvider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn complete(
            &self,
            request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            let model = request.model.clone();
            async move {
                Ok(CompletionResponse {
                    id: "echo-1".into(),
                    model,
                    choices: vec![Choice {
                        content: last,
                        tool_calls: vec![],
                        stop_reason: StopReason::EndTurn,
                    }],
                    usage: Usage::default(),
                })
            }
        }
    }

    #[tokio::test]
    async fn delegates_to_wrapped_provider() {
        let provider = BoxLlmProvider::new(Echo);
        assert_eq!(provider.name(), "echo");
        assert_eq!(format!("{provider:?}"), "BoxLlmProvider(\"echo\")");

        let request = CompletionRequest {
            model: "o1".into(),
            messages: vec![Message::user("ping")],
            system: None,
            tools: vec![],
            max_tokens: None,
            temperature: None,
        };
        let response = provider.complete(&request).await.unwrap();
        assert_eq!(response.model, "o1");
        assert_eq!(response.choices[0].content, "ping");
    }
}
