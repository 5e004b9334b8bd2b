//! LLM provider abstraction.
//!
//! `LlmProvider` is the port every model backend implements; `BoxLlmProvider`
//! erases the concrete type so the provider can be picked at runtime.

pub mod box_provider;
pub mod provider;
