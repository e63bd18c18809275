//! agent-llm-adapter: chat-model invocation adapter for agent frameworks
//!
//! This library sits between an agent runner that treats its model as an
//! untyped chat object and a chat-completion backend that expects role-tagged
//! turns. It normalizes arbitrary input, dispatches it, and answers the
//! capability probes agent frameworks perform.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::too_many_lines)]

pub mod cli;
pub mod config;
pub mod error;
pub mod messages;
pub mod normalize;
pub mod services;

// Re-exports for convenience
pub use error::{AdapterError, BackendError, Result};
pub use messages::{Conversation, Response, Role, Turn};
pub use normalize::{normalize, ChatInput, TurnLike};
pub use services::{
    adapters::{Capabilities, ChatAdapter},
    ChatBackend, InvocationOptions,
};
