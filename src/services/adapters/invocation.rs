//! Invocation adapter
//!
//! Normalizes caller input, dispatches it to the backend and applies the
//! single diagnostic retry.
//!
//! When the backend fails, the original conversation is *not* resent. The
//! adapter replaces it with one user turn describing the failure and calls
//! the backend exactly once more; a second failure is surfaced as
//! [`AdapterError::BackendInvocationFailed`]. There is no backoff and no
//! further retry, so a paid backend is called at most twice per invocation.

use std::{fmt, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::capability::AdapterIdentity;
use crate::{
    config::{
        models::BackendProfile,
        settings::{AdapterSettings, DEFAULT_DIAGNOSTIC_MAX_CHARS, MIN_DIAGNOSTIC_MAX_CHARS},
    },
    error::{AdapterError, BackendError, Result},
    messages::{Conversation, Response, Turn},
    normalize::{normalize, ChatInput},
    services::{sanitize_error_text, BackendFactory, ChatBackend, InvocationOptions},
};

/// Prefix of the diagnostic turn sent on retry
pub const DIAGNOSTIC_PREFIX: &str = "Error processing input: ";

/// Build the user turn that replaces the conversation after a backend failure
///
/// `max_chars` bounds the whole text. Only the failure part is shortened, and
/// bounds below [`MIN_DIAGNOSTIC_MAX_CHARS`] are raised to it, so the turn
/// always names the failure.
#[must_use]
pub fn diagnostic_turn(error: &BackendError, max_chars: usize) -> Turn {
    let detail_chars = max_chars.max(MIN_DIAGNOSTIC_MAX_CHARS) - DIAGNOSTIC_PREFIX.len();
    let detail = sanitize_error_text(&error.to_string(), detail_chars);
    Turn::user(format!("{DIAGNOSTIC_PREFIX}{detail}"))
}

/// Chat-model facade over a backend
pub struct ChatAdapter<B: ?Sized = dyn ChatBackend> {
    backend: Arc<B>,
    identity: AdapterIdentity,
    diagnostic_max_chars: usize,
}

impl ChatAdapter {
    /// Build the backend described by `profile` and wrap it
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be created
    pub fn from_profile(profile: &BackendProfile, settings: &AdapterSettings) -> Result<Self> {
        let backend = BackendFactory::create(profile)?;
        Ok(Self::new(backend).with_diagnostic_max_chars(settings.diagnostic_max_chars))
    }
}

impl<B: ChatBackend + ?Sized> ChatAdapter<B> {
    /// Wrap a backend, fixing its identity now
    pub fn new(backend: Arc<B>) -> Self {
        let identity = AdapterIdentity::from_backend(backend.as_ref());
        debug!(
            provider = %identity.provider(),
            model = identity.model_name(),
            kind = backend.kind(),
            "chat adapter created"
        );
        Self {
            backend,
            identity,
            diagnostic_max_chars: DEFAULT_DIAGNOSTIC_MAX_CHARS,
        }
    }

    /// Bound the diagnostic turn to `max_chars` characters, never below
    /// [`MIN_DIAGNOSTIC_MAX_CHARS`]
    #[must_use]
    pub fn with_diagnostic_max_chars(mut self, max_chars: usize) -> Self {
        self.diagnostic_max_chars = max_chars.max(MIN_DIAGNOSTIC_MAX_CHARS);
        self
    }

    #[must_use]
    pub fn identity(&self) -> &AdapterIdentity {
        &self.identity
    }

    /// Raw backend handle, for fields outside the [`Capabilities`](super::Capabilities) set
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Normalize `input`, call the backend, retry once with a diagnostic turn on failure
    ///
    /// `options` reach the backend unchanged. Dropping the returned future
    /// drops the in-flight backend call.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::BackendInvocationFailed`] when the retry fails too
    /// - [`AdapterError::Cancelled`] when the backend reports cancellation
    pub async fn invoke(
        &self,
        input: impl Into<ChatInput>,
        options: Option<&InvocationOptions>,
    ) -> Result<Response> {
        let conversation = normalize(input);
        self.dispatch(conversation, options).await
    }

    /// Like [`invoke`](Self::invoke), resolving to [`AdapterError::Cancelled`]
    /// as soon as `token` is cancelled. No retry follows a cancellation.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke), plus [`AdapterError::Cancelled`]
    pub async fn invoke_with_cancellation(
        &self,
        input: impl Into<ChatInput>,
        options: Option<&InvocationOptions>,
        token: &CancellationToken,
    ) -> Result<Response> {
        let conversation = normalize(input);
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(provider = %self.identity.provider(), "invocation cancelled by caller");
                Err(AdapterError::Cancelled)
            }
            result = self.dispatch(conversation, options) => result,
        }
    }

    /// Synchronous [`invoke`](Self::invoke) for callers that cannot suspend
    ///
    /// Drives the call on a private current-thread runtime.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke), plus [`AdapterError::Runtime`] when
    /// called from inside an async runtime
    pub fn invoke_blocking(
        &self,
        input: impl Into<ChatInput>,
        options: Option<&InvocationOptions>,
    ) -> Result<Response> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(AdapterError::Runtime(
                "invoke_blocking called from within an async runtime; use invoke".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.invoke(input, options))
    }

    async fn dispatch(
        &self,
        conversation: Conversation,
        options: Option<&InvocationOptions>,
    ) -> Result<Response> {
        let invocation_id = Uuid::new_v4();
        debug!(
            %invocation_id,
            provider = %self.identity.provider(),
            turns = conversation.len(),
            "dispatching conversation"
        );

        let first = match self.backend.complete(&conversation, options).await {
            Ok(content) => return Ok(Response::new(content)),
            Err(BackendError::Cancelled) => return Err(AdapterError::Cancelled),
            Err(err) => err,
        };
        warn!(
            %invocation_id,
            provider = %self.identity.provider(),
            model = self.identity.model_name(),
            error = %first,
            "backend call failed, retrying once with a diagnostic turn"
        );

        let diagnostic = Conversation::single(diagnostic_turn(&first, self.diagnostic_max_chars));
        match self.backend.complete(&diagnostic, options).await {
            Ok(content) => Ok(Response::new(content)),
            Err(BackendError::Cancelled) => Err(AdapterError::Cancelled),
            Err(source) => {
                error!(
                    %invocation_id,
                    provider = %self.identity.provider(),
                    model = self.identity.model_name(),
                    error = %source,
                    "diagnostic retry failed"
                );
                Err(AdapterError::BackendInvocationFailed { source })
            }
        }
    }
}

impl<B: ?Sized> Clone for ChatAdapter<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            identity: self.identity.clone(),
            diagnostic_max_chars: self.diagnostic_max_chars,
        }
    }
}

impl<B: ?Sized> fmt::Debug for ChatAdapter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatAdapter")
            .field("identity", &self.identity)
            .field("diagnostic_max_chars", &self.diagnostic_max_chars)
            .finish_non_exhaustive()
    }
}
