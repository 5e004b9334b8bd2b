//! OpenAI-compatible LLM provider implementation.
//!
//! [`OpenAiCompatibleProvider`] speaks the chat completions protocol through
//! [`async_openai`], so any server exposing that API (OpenAI itself, or a
//! compatible gateway behind a custom base URL) can back the assistant.
//! Tool declarations, assistant tool calls and tool results are mapped in
//! both directions, and every returned choice is kept.

pub mod config;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestToolMessage,
    ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionTool, ChatCompletionTools,
    CreateChatCompletionRequest, CreateChatCompletionResponse, FinishReason, FunctionCall,
    FunctionObject,
};
use secrecy::ExposeSecret;
use tracing::Instrument;
use tracing::field::Empty;

use concierge_core::llm::provider::LlmProvider;
use concierge_observe::genai_attrs::{
    GEN_AI_RESPONSE_FINISH_REASONS, GEN_AI_RESPONSE_ID, GEN_AI_RESPONSE_MODEL,
    GEN_AI_USAGE_INPUT_TOKENS, GEN_AI_USAGE_OUTPUT_TOKENS,
};
use concierge_types::llm::{
    Choice, CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, StopReason,
    ToolCall, ToolDefinition, Usage,
};

use self::config::OpenAiCompatConfig;

/// Provider for any OpenAI-compatible chat completions API.
///
/// # API Key Security
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
        }
    }

    /// Create a provider for the public OpenAI API.
    pub fn openai(api_key: secrecy::SecretString, model: &str) -> Self {
        Self::new(config::openai_defaults(api_key, model))
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(system_message(system));
        }

        for msg in &request.messages {
            messages.push(map_message(msg)?);
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(request.tools.iter().map(map_tool).collect())
        };

        Ok(CreateChatCompletionRequest {
            model,
            messages,
            tools,
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        })
    }
}

fn system_message(content: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content.to_string()),
        name: None,
    })
}

fn map_message(msg: &Message) -> Result<ChatCompletionRequestMessage, LlmError> {
    let mapped = match msg.role {
        MessageRole::System => system_message(&msg.content),
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
            name: None,
        }),
        MessageRole::Assistant => {
            let tool_calls = if msg.tool_calls.is_empty() {
                None
            } else {
                Some(
                    msg.tool_calls
                        .iter()
                        .map(|call| {
                            ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
                                id: call.id.clone(),
                                function: FunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                },
                            })
                        })
                        .collect(),
                )
            };
            // A tool-call-only assistant turn carries no text.
            let content = if msg.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.content.clone(),
                ))
            };
            #[allow(deprecated)]
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content,
                refusal: None,
                name: None,
                audio: None,
                tool_calls,
                function_call: None,
            })
        }
        MessageRole::Tool => {
            let tool_call_id = msg.tool_call_id.clone().ok_or_else(|| {
                LlmError::InvalidRequest("tool message without tool_call_id".to_string())
            })?;
            ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: ChatCompletionRequestToolMessageContent::Text(msg.content.clone()),
                tool_call_id,
            })
        }
    };
    Ok(mapped)
}

fn map_tool(tool: &ToolDefinition) -> ChatCompletionTools {
    ChatCompletionTools::Function(ChatCompletionTool {
        function: FunctionObject {
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            parameters: Some(tool.parameters.clone()),
            strict: None,
        },
    })
}

fn map_finish_reason(reason: Option<&FinishReason>) -> StopReason {
    match reason {
        Some(FinishReason::Stop) | None => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        Some(FinishReason::ToolCalls) | Some(FinishReason::FunctionCall) => StopReason::ToolUse,
        Some(FinishReason::ContentFilter) => StopReason::ContentFilter,
    }
}

/// Convert every returned choice, keeping function tool calls only.
fn map_response(response: CreateChatCompletionResponse) -> CompletionResponse {
    let choices = response
        .choices
        .into_iter()
        .map(|choice| {
            let tool_calls = choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .filter_map(|call| match call {
                    ChatCompletionMessageToolCalls::Function(call) => Some(ToolCall {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    }),
                    _ => None,
                })
                .collect();
            Choice {
                content: choice.message.content.unwrap_or_default(),
                tool_calls,
                stop_reason: map_finish_reason(choice.finish_reason.as_ref()),
            }
        })
        .collect();

    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    CompletionResponse {
        id: response.id,
        model: response.model,
        choices,
        usage,
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request)?;

        let span = tracing::debug_span!(
            "openai.chat.create",
            gen_ai.response.id = Empty,
            gen_ai.response.model = Empty,
            gen_ai.response.finish_reasons = Empty,
            gen_ai.usage.input_tokens = Empty,
            gen_ai.usage.output_tokens = Empty,
        );

        let response = self
            .client
            .chat()
            .create(oai_request)
            .instrument(span.clone())
            .await
            .map_err(map_openai_error)?;

        let response = map_response(response);

        span.record(GEN_AI_RESPONSE_ID, response.id.as_str());
        span.record(GEN_AI_RESPONSE_MODEL, response.model.as_str());
        span.record(GEN_AI_USAGE_INPUT_TOKENS, response.usage.input_tokens);
        span.record(GEN_AI_USAGE_OUTPUT_TOKENS, response.usage.output_tokens);
        let finish_reasons = response
            .choices
            .iter()
            .map(|c| c.stop_reason.to_string())
            .collect::<Vec<_>>()
            .join(",");
        span.record(GEN_AI_RESPONSE_FINISH_REASONS, finish_reasons.as_str());

        Ok(response)
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Incorrect API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                LlmError::ContextLengthExceeded {
                    max: 0,
                    requested: 0,
                }
            } else if code == "server_error" || error_type == "overloaded_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            Some(503) | Some(529) => LlmError::Overloaded(err.to_string()),
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::openai(SecretString::from("sk-test".to_string()), "o1")
    }

    fn request(messages: Vec<Message>, tools: Vec<ToolDefinition>) -> CompletionRequest {
        CompletionRequest {
            model: "o1".to_string(),
            messages,
            system: Some("Be helpful".to_string()),
            tools,
            max_tokens: None,
            temperature: None,
        }
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".to_string(),
            description: "Get weather".to_string(),
            parameters: json!({"type": "object", "properties": {"location": {"type": "string"}}}),
        }
    }

    #[test]
    fn build_request_prepends_system_and_maps_tools() {
        let req = request(vec![Message::user("Hello")], vec![weather_tool()]);
        let oai = provider().build_request(&req).unwrap();

        assert_eq!(oai.model, "o1");
        assert_eq!(oai.messages.len(), 2);
        assert!(matches!(oai.messages[0], ChatCompletionRequestMessage::System(_)));
        let tools = oai.tools.unwrap();
        assert_eq!(tools.len(), 1);
        match &tools[0] {
            ChatCompletionTools::Function(tool) => {
                assert_eq!(tool.function.name, "get_weather");
                assert_eq!(tool.function.parameters.as_ref().unwrap()["type"], "object");
            }
            _ => panic!("expected function tool"),
        }
    }

    #[test]
    fn build_request_without_tools_omits_field() {
        let oai = provider()
            .build_request(&request(vec![Message::user("Hi")], Vec::new()))
            .unwrap();
        assert!(oai.tools.is_none());
    }

    #[test]
    fn build_request_maps_tool_call_round_trip() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "get_weather".to_string(),
            arguments: r#"{"location":"Barcelona"}"#.to_string(),
        };
        let req = request(
            vec![
                Message::user("Weather?"),
                Message::assistant_tool_calls("", vec![call]),
                Message::tool_result("call_1", "Sunny"),
            ],
            vec![weather_tool()],
        );
        let oai = provider().build_request(&req).unwrap();
        assert_eq!(oai.messages.len(), 4);

        match &oai.messages[2] {
            ChatCompletionRequestMessage::Assistant(assistant) => {
                assert!(assistant.content.is_none());
                let calls = assistant.tool_calls.as_ref().unwrap();
                match &calls[0] {
                    ChatCompletionMessageToolCalls::Function(call) => {
                        assert_eq!(call.id, "call_1");
                        assert_eq!(call.function.name, "get_weather");
                    }
                    _ => panic!("expected function call"),
                }
            }
            other => panic!("expected assistant message, got {other:?}"),
        }
        match &oai.messages[3] {
            ChatCompletionRequestMessage::Tool(tool) => assert_eq!(tool.tool_call_id, "call_1"),
            other => panic!("expected tool message, got {other:?}"),
        }
    }

    #[test]
    fn tool_message_without_id_is_rejected() {
        let mut msg = Message::tool_result("x", "y");
        msg.tool_call_id = None;
        let err = provider()
            .build_request(&request(vec![msg], Vec::new()))
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[test]
    fn empty_model_uses_default() {
        let mut req = request(Vec::new(), Vec::new());
        req.model = String::new();
        assert_eq!(provider().build_request(&req).unwrap().model, "o1");
    }

    #[test]
    fn response_keeps_every_choice_and_tool_call() {
        let raw = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "o1-2024",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_9",
                            "type": "function",
                            "function": {"name": "get_today_date", "arguments": "{}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                },
                {
                    "index": 1,
                    "message": {"role": "assistant", "content": "Hello"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        });
        let response: CreateChatCompletionResponse = serde_json::from_value(raw).unwrap();
        let mapped = map_response(response);

        assert_eq!(mapped.model, "o1-2024");
        assert_eq!(mapped.choices.len(), 2);
        assert_eq!(mapped.choices[0].stop_reason, StopReason::ToolUse);
        assert_eq!(mapped.choices[0].tool_calls[0].name, "get_today_date");
        assert_eq!(mapped.choices[0].content, "");
        assert_eq!(mapped.choices[1].content, "Hello");
        assert_eq!(mapped.usage.input_tokens, 12);
    }

    #[test]
    fn finish_reasons_map_to_stop_reasons() {
        assert_eq!(map_finish_reason(None), StopReason::EndTurn);
        assert_eq!(map_finish_reason(Some(&FinishReason::Length)), StopReason::MaxTokens);
        assert_eq!(
            map_finish_reason(Some(&FinishReason::ContentFilter)),
            StopReason::ContentFilter
        );
    }

    #[test]
    fn api_errors_map_to_llm_errors() {
        use async_openai::error::{ApiError, OpenAIError};

        let auth = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: Some("invalid_api_key".to_string()),
        };
        assert!(matches!(
            map_openai_error(OpenAIError::ApiError(auth)),
            LlmError::AuthenticationFailed
        ));

        let limited = ApiError {
            message: "Rate limit reached".to_string(),
            r#type: Some("rate_limit_error".to_string()),
            param: None,
            code: None,
        };
        assert!(matches!(
            map_openai_error(OpenAIError::ApiError(limited)),
            LlmError::RateLimited { .. }
        ));

        assert!(matches!(
            map_openai_error(OpenAIError::InvalidArgument("bad".to_string())),
            LlmError::InvalidRequest(_)
        ));
    }
}
