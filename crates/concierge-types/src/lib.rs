//! Shared domain types for Concierge.
//!
//! This crate contains the types passed between the orchestration core, its
//! adapters and the transport layer: conversations, LLM request/response
//! shapes, configuration, and the shared error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
