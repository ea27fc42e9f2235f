//! Flash storage and the success/error sentences shown after an action.
//!
//! A [`Flash`] entry is either *persisted* (it survives a redirect and is shown on the
//! next request) or *now* (visible only to the response being rendered). Entries carried
//! in from the previous request behave like *now* entries: readable, then discarded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::inflector::{pluralize, titleize, to_sentence};
use crate::naming::ResourceNaming;
use crate::traits::CrudResource;
use crate::validation::BASE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Danger,
}

impl FlashKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLifetime {
    Persisted,
    Now,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashEntry {
    pub message: String,
    pub lifetime: FlashLifetime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    entries: BTreeMap<FlashKind, FlashEntry>,
}

impl Flash {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flash handed over by the previous request: readable now, dropped afterwards.
    #[must_use]
    pub fn carried_over<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (FlashKind, S)>,
        S: Into<String>,
    {
        let mut flash = Self::new();
        for (kind, message) in entries {
            flash.set_now(kind, message);
        }
        flash
    }

    #[must_use]
    pub fn get(&self, kind: FlashKind) -> Option<&str> {
        self.entries.get(&kind).map(|entry| entry.message.as_str())
    }

    #[must_use]
    pub fn lifetime(&self, kind: FlashKind) -> Option<FlashLifetime> {
        self.entries.get(&kind).map(|entry| entry.lifetime)
    }

    /// Kept across the next redirect
    pub fn set(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.insert(kind, message.into(), FlashLifetime::Persisted);
    }

    /// Shown by the current render only
    pub fn set_now(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.insert(kind, message.into(), FlashLifetime::Now);
    }

    /// Sets a persisted entry unless one of `kind` is already present
    pub fn set_if_absent(&mut self, kind: FlashKind, message: impl Into<String>) {
        if !self.entries.contains_key(&kind) {
            self.set(kind, message);
        }
    }

    /// Sets a now entry unless one of `kind` is already present
    pub fn set_now_if_absent(&mut self, kind: FlashKind, message: impl Into<String>) {
        if !self.entries.contains_key(&kind) {
            self.set_now(kind, message);
        }
    }

    pub fn delete(&mut self, kind: FlashKind) -> Option<String> {
        self.entries.remove(&kind).map(|entry| entry.message)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlashKind, &str)> {
        self.entries
            .iter()
            .map(|(kind, entry)| (*kind, entry.message.as_str()))
    }

    /// Entries that must be stored for the next request
    pub fn persisted(&self) -> impl Iterator<Item = (FlashKind, &str)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.lifetime == FlashLifetime::Persisted)
            .map(|(kind, entry)| (*kind, entry.message.as_str()))
    }

    fn insert(&mut self, kind: FlashKind, message: String, lifetime: FlashLifetime) {
        self.entries.insert(kind, FlashEntry { message, lifetime });
    }
}

/// `approve` → `approved`, `submit` → `submitted`, `publish` → `published`
#[must_use]
pub fn past_tense(action: &str) -> String {
    let action = action.replace('_', " ");
    let doubled = if action == "submit" { "t" } else { "" };
    let suffix = if action.ends_with('e') { "d" } else { "ed" };
    format!("{action}{doubled}{suffix}")
}

/// Verb used by bulk action messages, `archive` → `archived`
#[must_use]
pub fn action_verb(action: &str) -> String {
    past_tense(action)
}

/// `Post was successfully created`
#[must_use]
pub fn flash_success(naming: &ResourceNaming, action: Option<&str>) -> String {
    format!(
        "{} was successfully {}",
        titleize(naming.model_human_name()),
        past_tense(action.unwrap_or("save"))
    )
}

/// `Unable to create post: title can't be blank.`
///
/// Without an explicit action the verb is `create` for new records and `update` otherwise.
#[must_use]
pub fn flash_danger<R: CrudResource>(
    resource: &R,
    naming: &ResourceNaming,
    action: Option<&str>,
) -> String {
    let action = action
        .unwrap_or(if resource.is_new_record() { "create" } else { "update" })
        .replace('_', " ");
    let name = naming.model_human_name().to_lowercase();

    match flash_errors(resource, naming) {
        Some(messages) => format!("Unable to {action} {name}: {messages}."),
        None => format!("Unable to {action} {name}"),
    }
}

/// All validation messages of `resource` joined as one sentence, `None` without errors.
#[must_use]
pub fn flash_errors<R: CrudResource>(resource: &R, naming: &ResourceNaming) -> Option<String> {
    let messages: Vec<String> = resource
        .errors()
        .iter()
        .map(|error| {
            let message = error.message.as_str();
            let complete_sentence = message.chars().next().is_none_or(|c| !c.is_lowercase());

            if complete_sentence {
                message.to_string()
            } else if error.field == BASE {
                format!("{} {message}", naming.model_human_name().to_lowercase())
            } else if let Some(stem) = error.field.strip_suffix("_ids") {
                format!(
                    "{} {message}",
                    R::human_attribute_name(&pluralize(stem)).to_lowercase()
                )
            } else {
                format!(
                    "{} {message}",
                    R::human_attribute_name(&error.field).to_lowercase()
                )
            }
        })
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(to_sentence(&messages))
    }
}
