//! Input normalization
//!
//! Agent frameworks hand the chat model whatever they have at hand: a prompt
//! string, a message history, a dictionary of page context, or some opaque
//! value. [`ChatInput`] names the shapes the adapter recognizes and
//! [`normalize`] reduces each of them to a non-empty [`Conversation`].
//!
//! Normalization is total. Rendering failures degrade to a fixed placeholder
//! and are only reported through a debug log line.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    fmt::{self, Write as _},
};

use serde_json::Value;
use tracing::debug;

use crate::messages::{Conversation, Role, Turn};

/// Text substituted when a value cannot be rendered at all
pub const UNRENDERABLE_INPUT: &str = "[unrenderable input]";

/// Anything that exposes a text payload and possibly a role
pub trait TurnLike {
    /// Message payload
    fn text(&self) -> Cow<'_, str>;

    /// Role, when the value carries one
    fn role(&self) -> Option<Role> {
        None
    }
}

impl TurnLike for Turn {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }

    fn role(&self) -> Option<Role> {
        Some(self.role)
    }
}

/// Input shapes accepted by the adapter
pub enum ChatInput {
    /// Plain prompt text
    Text(String),
    /// Already-normalized turns
    Turns(Vec<Turn>),
    /// Sequence whose elements are not all turn-like
    Sequence(Vec<Value>),
    /// Key-value context; keys are kept sorted
    Mapping(BTreeMap<String, Value>),
    /// One turn-like value
    Single { role: Option<Role>, text: String },
    /// Anything else, rendered through `Display`
    Opaque(Box<dyn fmt::Display + Send + Sync>),
}

impl ChatInput {
    /// Wrap an arbitrary displayable value
    pub fn opaque(value: impl fmt::Display + Send + Sync + 'static) -> Self {
        Self::Opaque(Box::new(value))
    }

    /// Wrap a single turn-like value
    pub fn from_turn_like(value: &impl TurnLike) -> Self {
        Self::Single {
            role: value.role(),
            text: value.text().into_owned(),
        }
    }

    /// Wrap a sequence of turn-like values, defaulting missing roles to `user`
    pub fn from_turn_likes<'a, T, I>(values: I) -> Self
    where
        T: TurnLike + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        Self::Turns(
            values
                .into_iter()
                .map(|value| Turn::new(value.role().unwrap_or(Role::User), value.text()))
                .collect(),
        )
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Turns(_) => "turns",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
            Self::Single { .. } => "single",
            Self::Opaque(_) => "opaque",
        }
    }
}

impl fmt::Debug for ChatInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Turns(turns) => f.debug_tuple("Turns").field(turns).finish(),
            Self::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Self::Mapping(map) => f.debug_tuple("Mapping").field(map).finish(),
            Self::Single { role, text } => f
                .debug_struct("Single")
                .field("role", role)
                .field("text", text)
                .finish(),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<String> for ChatInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ChatInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Turn> for ChatInput {
    fn from(turn: Turn) -> Self {
        Self::Single {
            role: Some(turn.role),
            text: turn.text,
        }
    }
}

impl From<Vec<Turn>> for ChatInput {
    fn from(turns: Vec<Turn>) -> Self {
        Self::Turns(turns)
    }
}

impl From<Conversation> for ChatInput {
    fn from(conversation: Conversation) -> Self {
        Self::Turns(conversation.into_turns())
    }
}

impl From<BTreeMap<String, Value>> for ChatInput {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Mapping(map)
    }
}

/// Classify an untyped JSON value.
///
/// Strings are text, arrays made only of turn-like objects are turns, other
/// arrays are sequences, objects are mappings, and scalars are rendered.
impl From<Value> for ChatInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(items) => {
                let turns: Option<Vec<Turn>> = if items.is_empty() {
                    None
                } else {
                    items.iter().map(turn_from_value).collect()
                };
                match turns {
                    Some(turns) => Self::Turns(turns),
                    None => Self::Sequence(items),
                }
            }
            Value::Object(map) => Self::Mapping(map.into_iter().collect()),
            other => Self::opaque(other),
        }
    }
}

/// Reduce any accepted input to a non-empty conversation.
///
/// Never fails: odd shapes are rendered best-effort, and a rendering failure
/// is replaced by a fixed placeholder.
pub fn normalize(input: impl Into<ChatInput>) -> Conversation {
    let input = input.into();
    let shape = input.shape();
    let conversation = match input {
        ChatInput::Text(text) => Conversation::single(Turn::user(text)),
        ChatInput::Turns(turns) => match Conversation::new(turns) {
            Some(conversation) => conversation,
            None => {
                degraded(shape, "empty turn list");
                Conversation::single(Turn::user(render_sequence(&[])))
            }
        },
        ChatInput::Sequence(items) => Conversation::single(Turn::user(render_sequence(&items))),
        ChatInput::Mapping(map) => Conversation::single(Turn::user(render_mapping(&map))),
        ChatInput::Single { role, text } => {
            Conversation::single(Turn::new(role.unwrap_or(Role::User), text))
        }
        ChatInput::Opaque(value) => {
            let text = render_display(value.as_ref()).unwrap_or_else(|| {
                degraded(shape, "Display implementation failed");
                UNRENDERABLE_INPUT.to_string()
            });
            Conversation::single(Turn::user(text))
        }
    };
    debug!(shape, turns = conversation.len(), "normalized input");
    conversation
}

fn degraded(shape: &str, reason: &str) {
    debug!(shape, reason, "normalization degraded");
}

fn render_display(value: &(dyn fmt::Display + Send + Sync)) -> Option<String> {
    let mut out = String::new();
    write!(out, "{value}").ok()?;
    Some(out)
}

fn render_sequence(items: &[Value]) -> String {
    Value::from(items.to_vec()).to_string()
}

fn render_mapping(map: &BTreeMap<String, Value>) -> String {
    match (map.get("page_content"), map.get("items")) {
        (Some(Value::String(page)), _) => page.clone(),
        (_, Some(items)) => items.to_string(),
        // serde_json's default `Map` keeps keys sorted
        _ => Value::Object(map.clone().into_iter().collect()).to_string(),
    }
}

fn turn_from_value(value: &Value) -> Option<Turn> {
    let object = value.as_object()?;
    let payload = object.get("content").or_else(|| object.get("text"))?;
    let role = ["role", "type"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .find_map(Role::from_label)
        .unwrap_or(Role::User);
    Some(Turn::new(role, flatten_payload(payload)))
}

/// Flatten a structured payload into plain text
fn flatten_payload(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::String(text) => text.clone(),
                Value::Object(object) => match object.get("text") {
                    Some(Value::String(text)) => text.clone(),
                    _ => part.to_string(),
                },
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
