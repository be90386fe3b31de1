//! Decoded value shape
//!
//! Decoding projects an XML node through its declaration into a typed value
//! tree: an element becomes a `DecodedValue` with typed attributes, typed
//! text content for simple content, or an ordered list of decoded children
//! for element-only content. Encoding consumes the same shape back into a
//! node tree.

use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::nodes::XmlNode;
use base64::Engine;
use chrono::NaiveDate;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A typed value produced by decoding a lexical representation
#[derive(Debug, Clone, PartialEq)]
pub enum XsdValue {
    /// String value (also used for token-like types)
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Arbitrary-precision decimal value
    Decimal(Decimal),
    /// Calendar date value
    Date(NaiveDate),
    /// Binary value decoded from base64
    Binary(Vec<u8>),
    /// Explicit nil for nilled elements
    Null,
}

impl XsdValue {
    /// Render the canonical lexical form of this value
    pub fn to_lexical(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Binary(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
            Self::Null => String::new(),
        }
    }

    /// True for the explicit nil value
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Serialize for XsdValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            // Decimals and dates keep their lexical form so no precision is
            // lost through a float representation.
            Self::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Self::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Self::Binary(bytes) => serializer
                .serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes)),
            Self::Null => serializer.serialize_none(),
        }
    }
}

/// Decoded element content: typed attributes plus either typed text or an
/// ordered list of decoded children
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedValue {
    /// Tag of the source element
    pub tag: QName,
    /// Typed text content for simple content elements
    pub text: Option<XsdValue>,
    /// Ordered decoded children for element-only content
    pub content: Option<Vec<(QName, DecodedValue)>>,
    /// Typed attribute values keyed by local name, declared order first
    pub attributes: IndexMap<String, XsdValue>,
}

impl DecodedValue {
    /// Create an empty decoded value for a tag
    pub fn new(tag: QName) -> Self {
        Self {
            tag,
            text: None,
            content: None,
            attributes: IndexMap::new(),
        }
    }

    /// Create a decoded value carrying only text content
    pub fn with_text(tag: QName, text: XsdValue) -> Self {
        Self {
            tag,
            text: Some(text),
            content: None,
            attributes: IndexMap::new(),
        }
    }

    /// Look up a decoded attribute by local name
    pub fn attribute(&self, name: &str) -> Option<&XsdValue> {
        self.attributes.get(name)
    }

    /// Find the first decoded child with the given local name
    pub fn child(&self, local_name: &str) -> Option<&DecodedValue> {
        self.content
            .as_ref()?
            .iter()
            .find(|(tag, _)| tag.local_name == local_name)
            .map(|(_, value)| value)
    }

    /// All decoded children with the given local name
    pub fn children(&self, local_name: &str) -> Vec<&DecodedValue> {
        match &self.content {
            Some(content) => content
                .iter()
                .filter(|(tag, _)| tag.local_name == local_name)
                .map(|(_, value)| value)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Project this value to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Value(e.to_string()))
    }

    /// Structural decode with no semantic checks.
    ///
    /// Used by skip mode: attributes and text come through as plain strings
    /// and every child is decoded recursively the same way.
    pub fn from_node_unchecked(node: &XmlNode) -> Self {
        let mut out = DecodedValue::new(node.tag.clone());
        for (name, value) in &node.attributes {
            out.attributes
                .insert(name.clone(), XsdValue::String(value.clone()));
        }
        if node.children.is_empty() {
            if let Some(text) = node.trimmed_text() {
                out.text = Some(XsdValue::String(text.to_string()));
            }
        } else {
            out.content = Some(
                node.children
                    .iter()
                    .map(|c| (c.tag.clone(), Self::from_node_unchecked(c)))
                    .collect(),
            );
        }
        out
    }

    /// Structural encode with no semantic checks, the inverse of
    /// [`from_node_unchecked`](Self::from_node_unchecked)
    pub fn to_node_unchecked(&self) -> XmlNode {
        let mut node = XmlNode::new(self.tag.clone());
        for (name, value) in &self.attributes {
            node.attributes.insert(name.clone(), value.to_lexical());
        }
        if let Some(ref text) = self.text {
            if !text.is_null() {
                node.text = Some(text.to_lexical());
            }
        }
        if let Some(ref content) = self.content {
            for (_, child) in content {
                node.children.push(child.to_node_unchecked());
            }
        }
        node
    }
}

impl Serialize for DecodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut len = 1 + self.attributes.len();
        if self.text.is_some() {
            len += 1;
        }
        if self.content.is_some() {
            len += 1;
        }
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("tag", &self.tag.to_string())?;
        for (name, value) in &self.attributes {
            map.serialize_entry(&format!("@{}", name), value)?;
        }
        if let Some(ref text) = self.text {
            map.serialize_entry("$", text)?;
        }
        if let Some(ref content) = self.content {
            map.serialize_entry("content", &ContentSeq(content))?;
        }
        map.end()
    }
}

struct ContentSeq<'a>(&'a [(QName, DecodedValue)]);

impl Serialize for ContentSeq<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (_, value) in self.0 {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}
