//! Shared types for the exportdesk gateway: the chat wire model, the common
//! error type, streaming events, and TOML configuration.

pub mod chat;
pub mod config;
pub mod error;
pub mod stream;
