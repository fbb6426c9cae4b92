//! Editor content and normalization of legacy stored shapes.
//!
//! The coordinator treats content as an opaque JSON payload. The canonical
//! editor value is an array of element nodes:
//!
//! ```text
//! [ { "type": "p",  "children": [ { "text": "Hello" } ] },
//!   { "type": "h2", "children": [ { "text": "Notes" } ] } ]
//! ```
//!
//! Older documents were stored in other shapes. [`LegacyContent`] names each
//! shape explicitly and converts it into the canonical form.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Immutable snapshot of the editor's document payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentValue(Value);

impl ContentValue {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// A document holding a single empty paragraph.
    pub fn empty_document() -> Self {
        Self(json!([element("p", vec![text_leaf("")])]))
    }

    /// Build a canonical document with one paragraph per entry.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes: Vec<Value> = paragraphs
            .into_iter()
            .map(|p| element("p", vec![text_leaf(p.as_ref())]))
            .collect();
        if nodes.is_empty() {
            return Self::empty_document();
        }
        Self(Value::Array(nodes))
    }

    /// Normalize a stored value of any known shape.
    pub fn normalize(raw: Value) -> Self {
        LegacyContent::classify(raw).into_content()
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }

    /// Concatenated leaf text of each top-level node.
    ///
    /// Returns an empty vector when the content is not a node array.
    pub fn paragraph_texts(&self) -> Vec<String> {
        match &self.0 {
            Value::Array(nodes) => nodes
                .iter()
                .map(|node| {
                    let mut out = String::new();
                    collect_text(node, &mut out);
                    out
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Value> for ContentValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ContentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn collect_text(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            collect_text(child, out);
        }
    }
}

fn element(kind: &str, children: Vec<Value>) -> Value {
    json!({ "type": kind, "children": children })
}

fn text_leaf(text: &str) -> Value {
    json!({ "text": text })
}

/// A list entry inside a legacy `list` block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextItem {
    #[serde(default)]
    pub content: Option<String>,
}

impl RichTextItem {
    /// Read an item from loosely-typed stored JSON.
    pub fn from_value(raw: &Value) -> Self {
        Self {
            content: loose_text(raw.get("content")).or_else(|| loose_text(Some(raw))),
        }
    }
}

/// One block of the legacy `rich_text` document shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub items: Vec<RichTextItem>,
}

impl RichTextBlock {
    /// Read a block from loosely-typed stored JSON.
    ///
    /// Old documents carry levels as strings and text as numbers. Each field
    /// is read on its own, and anything unreadable falls back to its default,
    /// so a bad field never costs the rest of the block. A bare string block
    /// becomes a paragraph of that text.
    pub fn from_value(raw: &Value) -> Self {
        if !raw.is_object() {
            return Self {
                kind: "paragraph".to_string(),
                content: loose_text(Some(raw)),
                ..Self::default()
            };
        }
        Self {
            kind: raw
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            level: loose_level(raw.get("level")),
            content: loose_text(raw.get("content")),
            items: raw
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(RichTextItem::from_value).collect())
                .unwrap_or_default(),
        }
    }

    fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    fn into_element(self) -> Value {
        match self.kind.as_str() {
            "heading" => {
                let level = self.level.filter(|l| *l > 0).unwrap_or(1);
                element(&format!("h{}", level), vec![text_leaf(self.text())])
            }
            "list" => {
                let items = self
                    .items
                    .iter()
                    .map(|item| {
                        element("li", vec![text_leaf(item.content.as_deref().unwrap_or(""))])
                    })
                    .collect();
                element("ul", items)
            }
            // paragraphs and unrecognised block kinds both become paragraphs
            _ => element("p", vec![text_leaf(self.text())]),
        }
    }
}

fn loose_text(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn loose_level(raw: Option<&Value>) -> Option<u32> {
    match raw? {
        Value::Number(n) => n.as_u64().and_then(|l| u32::try_from(l).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The shapes stored content has been found in.
#[derive(Clone, Debug, PartialEq)]
pub enum LegacyContent {
    /// Already an array of editor nodes.
    Nodes(Vec<Value>),
    /// Null or absent content.
    Empty,
    /// `{ "type": "rich_text", "blocks": [...] }` from the old block editor.
    RichText(Vec<RichTextBlock>),
    /// Anything else; kept so it can be shown rather than lost.
    Unknown(Value),
}

impl LegacyContent {
    /// Decide which shape a raw stored value is in.
    pub fn classify(raw: Value) -> Self {
        match raw {
            Value::Null => LegacyContent::Empty,
            Value::String(s) if s.is_empty() => LegacyContent::Empty,
            Value::Array(nodes) => LegacyContent::Nodes(nodes),
            Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("rich_text") => {
                match map.get("blocks").and_then(Value::as_array) {
                    Some(blocks) => {
                        LegacyContent::RichText(blocks.iter().map(RichTextBlock::from_value).collect())
                    }
                    None => LegacyContent::Unknown(Value::Object(map)),
                }
            }
            other => LegacyContent::Unknown(other),
        }
    }

    /// Convert into the canonical editor value.
    pub fn into_content(self) -> ContentValue {
        match self {
            LegacyContent::Nodes(nodes) => ContentValue(Value::Array(nodes)),
            LegacyContent::Empty => ContentValue::empty_document(),
            LegacyContent::RichText(blocks) => ContentValue(Value::Array(
                blocks.into_iter().map(RichTextBlock::into_element).collect(),
            )),
            LegacyContent::Unknown(value) => {
                tracing::warn!(content = %value, "unknown content format, using fallback");
                ContentValue(json!([element("p", vec![text_leaf(&value.to_string())])]))
            }
        }
    }
}
