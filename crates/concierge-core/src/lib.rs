//! Conversation-turn orchestration and port trait definitions for Concierge.
//!
//! This crate defines the "ports" (provider, repository, capability and hash
//! traits) that the infrastructure layer implements, together with the logic
//! that drives one conversation turn: the bounded tool loop, the title cache
//! and the turn coordinator. It depends only on `concierge-types` -- never on
//! `concierge-infra` or any database/IO crate.

pub mod agent;
pub mod chat;
pub mod context;
pub mod hash;
pub mod llm;
pub mod title;
pub mod tools;
