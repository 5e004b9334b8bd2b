//! Infrastructure layer for Concierge.
//!
//! Contains implementations of the ports defined in `concierge-core`:
//! SQLite conversation storage, the OpenAI-compatible model provider, the
//! WeatherAPI client, the ICS holiday feed, SHA-256 hashing and the
//! `config.toml` loader.

pub mod calendar;
pub mod config;
pub mod crypto;
pub mod llm;
pub mod sqlite;
pub mod weather;
