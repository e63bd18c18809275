//! Chat-model adapter exposed to agent frameworks
//!
//! [`ChatAdapter`] accepts whatever input an agent runner produces,
//! normalizes it into a [`Conversation`](crate::messages::Conversation),
//! calls the wrapped [`ChatBackend`](super::ChatBackend) and answers
//! capability probes through the [`Capabilities`] interface.

pub mod capability;
pub mod invocation;

#[cfg(test)]
pub(crate) mod testing;

pub use self::{
    capability::{AdapterIdentity, Capabilities, ProviderLabel},
    invocation::{diagnostic_turn, ChatAdapter},
};
