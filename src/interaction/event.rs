//! Interaction wire model and handler-facing events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ResponseContext;
use crate::embed::MessageCreate;
use crate::error::Result;
use crate::record::Suggestion;

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

/// Options supplied with a command, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionBag(BTreeMap<String, OptionValue>);

impl OptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: OptionValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn with_string(self, name: &str, value: &str) -> Self {
        self.with(name, OptionValue::String(value.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    /// String option, or `None` when absent or of another type.
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(OptionValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(OptionValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name) {
            Some(OptionValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Payload shared by command and autocomplete interactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    /// Interaction ID assigned by the platform.
    pub id: String,
    /// Command path, e.g. `/wiki`.
    pub path: String,
    #[serde(default)]
    pub options: OptionBag,
}

impl CommandData {
    pub fn new(id: &str, path: &str, options: OptionBag) -> Self {
        Self {
            id: id.to_string(),
            path: path.to_string(),
            options,
        }
    }
}

/// An incoming interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    /// A submitted command.
    Command(CommandData),
    /// A partially typed option awaiting suggestions.
    Autocomplete(CommandData),
}

impl Interaction {
    pub fn data(&self) -> &CommandData {
        match self {
            Interaction::Command(data) | Interaction::Autocomplete(data) => data,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.data().id
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.data().path
    }
}

/// Reply to one interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionResponse {
    Message {
        interaction_id: String,
        message: MessageCreate,
    },
    AutocompleteResult {
        interaction_id: String,
        choices: Vec<Suggestion>,
    },
}

impl InteractionResponse {
    pub fn interaction_id(&self) -> &str {
        match self {
            InteractionResponse::Message { interaction_id, .. }
            | InteractionResponse::AutocompleteResult { interaction_id, .. } => interaction_id,
        }
    }
}

/// A submitted command, as seen by a command handler.
pub struct CommandEvent {
    data: CommandData,
    ctx: ResponseContext,
}

impl CommandEvent {
    pub fn new(data: CommandData, ctx: ResponseContext) -> Self {
        Self { data, ctx }
    }

    pub fn data(&self) -> &CommandData {
        &self.data
    }

    pub fn options(&self) -> &OptionBag {
        &self.data.options
    }

    pub fn context(&self) -> &ResponseContext {
        &self.ctx
    }

    /// Reply with a message. Only the first reply is accepted.
    pub async fn respond(&self, message: MessageCreate) -> Result<()> {
        self.ctx.respond(message).await
    }
}

/// An autocomplete request, as seen by an autocomplete handler.
pub struct AutocompleteEvent {
    data: CommandData,
    ctx: ResponseContext,
}

impl AutocompleteEvent {
    pub fn new(data: CommandData, ctx: ResponseContext) -> Self {
        Self { data, ctx }
    }

    pub fn data(&self) -> &CommandData {
        &self.data
    }

    pub fn options(&self) -> &OptionBag {
        &self.data.options
    }

    pub fn context(&self) -> &ResponseContext {
        &self.ctx
    }

    /// Reply with suggestions. Only the first reply is accepted.
    pub async fn result(&self, choices: Vec<Suggestion>) -> Result<()> {
        self.ctx.result(choices).await
    }
}
