//! Domain library for the redirect validator.
//!
//! Holds the content model received from the CMS webhook, URL normalization,
//! the validation rules and the ports (traits) for the two read-only CMS
//! queries. Keep HTTP clients and runtime concerns out of this crate; only
//! serde/serde_json (payload schema) and tracing (error sink) are allowed in.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;

use serde::{Deserialize, Serialize};

/// Element codename holding the redirect's source paths.
pub const SOURCE_URLS_ELEMENT: &str = "source_urls";
/// Element codename holding the redirect's target path.
pub const TARGET_URL_ELEMENT: &str = "target_url";

/// A path in canonical form: trimmed, lowercased, without trailing slashes.
///
/// Two URLs are the same redirect source iff their normalized forms are equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Normalize `path`. Returns `None` when nothing remains after trimming.
    pub fn new(path: &str) -> Option<Self> {
        normalize::normalize_path(path).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Site-relative paths start with `/`.
    pub fn is_relative(&self) -> bool {
        self.0.starts_with('/')
    }
}

impl Display for NormalizedUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a content type as it appears in the item's system block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeRef {
    pub codename: String,
}

/// System block of a content item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSystem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentTypeRef,
}

/// One element of a content item. Only the value is interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A content item as delivered by the CMS. Never mutated once received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub system: ItemSystem,
    #[serde(default)]
    pub elements: BTreeMap<String, Element>,
}

impl ContentItem {
    /// Create an item without elements.
    pub fn new<I: Into<String>, T: Into<String>>(id: I, type_codename: T) -> Self {
        Self {
            system: ItemSystem {
                id: id.into(),
                content_type: ContentTypeRef {
                    codename: type_codename.into(),
                },
            },
            elements: BTreeMap::new(),
        }
    }

    /// Builder-style helper to attach an element value.
    pub fn with_element<S: Into<String>>(mut self, codename: S, value: serde_json::Value) -> Self {
        self.elements.insert(codename.into(), Element { value });
        self
    }

    pub fn id(&self) -> &str {
        &self.system.id
    }

    pub fn type_codename(&self) -> &str {
        &self.system.content_type.codename
    }

    /// Normalized `source_urls`, in the order they were entered.
    ///
    /// Missing or null element yields an empty list; blank entries are dropped.
    pub fn source_urls(&self) -> Result<Vec<NormalizedUrl>, CoreError> {
        let value = match self.elements.get(SOURCE_URLS_ELEMENT) {
            Some(el) => &el.value,
            None => return Ok(Vec::new()),
        };
        match value {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    let raw = entry.as_str().ok_or_else(|| {
                        CoreError::MalformedPayload(format!(
                            "{} of item {} contains a non-string entry",
                            SOURCE_URLS_ELEMENT,
                            self.id()
                        ))
                    })?;
                    if let Some(url) = NormalizedUrl::new(raw) {
                        out.push(url);
                    }
                }
                Ok(out)
            }
            _ => Err(CoreError::MalformedPayload(format!(
                "{} of item {} is not a list",
                SOURCE_URLS_ELEMENT,
                self.id()
            ))),
        }
    }

    /// Raw `target_url` value, if set and non-null.
    pub fn target_url(&self) -> Result<Option<&str>, CoreError> {
        match self.elements.get(TARGET_URL_ELEMENT).map(|el| &el.value) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(CoreError::MalformedPayload(format!(
                "{} of item {} is not a string",
                TARGET_URL_ELEMENT,
                self.id()
            ))),
        }
    }
}

/// Incoming webhook event. Only `data.items[0]` is ever looked at.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub items: Option<Vec<serde_json::Value>>,
}

impl WebhookEvent {
    /// Parse a raw webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(body)
            .map_err(|e| CoreError::MalformedPayload(format!("event body: {}", e)))
    }

    /// The triggering item, if the event carries one.
    ///
    /// Later items are left as raw JSON and never inspected.
    pub fn first_item(&self) -> Result<Option<ContentItem>, CoreError> {
        let first = self
            .data
            .as_ref()
            .and_then(|d| d.items.as_ref())
            .and_then(|items| items.first());
        match first {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(raw) => ContentItem::deserialize(raw)
                .map(Some)
                .map_err(|e| CoreError::MalformedPayload(format!("data.items[0]: {}", e))),
        }
    }
}

/// Severity of a validation message. The CMS only acts on errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub message: String,
}

impl ValidationMessage {
    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Verdict returned to the CMS for one webhook call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ValidationMessage>,
}

impl ValidationResult {
    /// Publishing may proceed.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            messages: Vec::new(),
        }
    }

    /// Publishing is blocked with exactly one explanatory message.
    pub fn rejected(message: ValidationMessage) -> Self {
        Self {
            is_valid: false,
            messages: vec![message],
        }
    }
}

/// Query port: items of a content type currently in a given workflow step.
pub trait ContentQuery: Send + Sync {
    fn list_items(
        &self,
        type_codename: &str,
        workflow_step: &str,
    ) -> impl Future<Output = Result<Vec<ContentItem>, CoreError>> + Send;
}

/// Resolution port: every URL that currently serves published content.
pub trait PublishedUrls: Send + Sync {
    fn published_urls(
        &self,
    ) -> impl Future<Output = Result<BTreeSet<NormalizedUrl>, CoreError>> + Send;
}

/// Core domain errors (no external error crates to keep deps small).
///
/// Both variants are infrastructure failures; validation failures are not
/// errors and travel as `ValidationResult`.
#[derive(Debug)]
pub enum CoreError {
    MalformedPayload(String),
    Query(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::MalformedPayload(msg) => write!(f, "malformed payload: {}", msg),
            CoreError::Query(msg) => write!(f, "content query failed: {}", msg),
        }
    }
}

impl Error for CoreError {}

pub mod adapters;
pub mod normalize;
pub mod service;
pub mod validate;
