//! Model-facing generation for a conversation turn.
//!
//! - `prompt`: fixed system instructions and conversion of stored messages
//! - `tool_loop`: the bounded tool-calling loop that produces the reply
//! - `title`: single-call title generation (no tools)

pub mod prompt;
pub mod title;
pub mod tool_loop;
