//! Scripted backend for adapter tests

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    error::BackendError,
    messages::Conversation,
    services::{ChatBackend, InvocationOptions},
};

/// What the backend does on its next call
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Reply(&'static str),
    Echo,
    Fail(String),
    Cancelled,
    Hang,
}

pub(crate) struct ScriptedBackend {
    kind: &'static str,
    model: Mutex<Option<String>>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(Conversation, Option<InvocationOptions>)>>,
    attempts: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(kind: &'static str, steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            kind,
            model: Mutex::new(Some("gpt-4o-mini".to_string())),
            temperature: None,
            max_tokens: None,
            steps: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn set_model(&self, model: Option<&str>) {
        *self.model.lock().unwrap() = model.map(String::from);
    }

    /// Number of `complete` calls started, including ones that never finished
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(Conversation, Option<InvocationOptions>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn kind(&self) -> &str {
        self.kind
    }

    fn model_name(&self) -> Option<String> {
        self.model.lock().unwrap().clone()
    }

    fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    fn extension(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            "streaming" => Some(false.into()),
            _ => None,
        }
    }

    async fn complete(
        &self,
        conversation: &Conversation,
        options: Option<&InvocationOptions>,
    ) -> Result<String, BackendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((conversation.clone(), options.cloned()));
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::Fail("script exhausted".to_string()));
        match step {
            Step::Reply(text) => Ok(text.to_string()),
            Step::Echo => Ok(conversation.last().text.clone()),
            Step::Fail(message) => Err(BackendError::Other(message)),
            Step::Cancelled => Err(BackendError::Cancelled),
            Step::Hang => std::future::pending().await,
        }
    }
}
