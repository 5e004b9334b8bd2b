//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions for consistent
//! LLM call instrumentation across the codebase. All constants are string slices
//! usable with `Span::record` on spans that declare the matching field.

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "openai").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "o1").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The model ID that actually served the request.
pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reasons for the response (e.g., "end_turn", "tool_use").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// The unique response ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

// --- Tool attributes ---

/// Name of a tool invoked by the model.
pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

/// Tool execution requested by the model.
pub const OP_EXECUTE_TOOL: &str = "execute_tool";

// --- Provider name values ---

/// OpenAI (and OpenAI-compatible) provider identifier.
pub const PROVIDER_OPENAI: &str = "openai";
