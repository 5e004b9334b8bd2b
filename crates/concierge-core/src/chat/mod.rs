//! Conversation persistence port and the turn coordinator.

pub mod repository;
pub mod service;
