//! XML instance tree
//!
//! This module provides the node collaborator the engine traverses and
//! constructs: an element with a tag, ordered attributes, ordered children
//! and optional text. Parsing goes through roxmltree, serialization through
//! quick-xml's writer.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::namespaces::QName;
use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Attribute name carrying the nil marker for nillable elements
pub const NIL_ATTRIBUTE: &str = "nil";

/// XML element node
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    /// Element tag
    pub tag: QName,
    /// Attributes in document order, local name keyed
    pub attributes: IndexMap<String, String>,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
    /// Text content (None when the element carries no character data)
    pub text: Option<String>,
}

impl XmlNode {
    /// Create a new element node
    pub fn new(tag: QName) -> Self {
        Self {
            tag,
            attributes: IndexMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a child element
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Get an attribute value by local name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Check the nil marker attribute
    pub fn is_nil(&self) -> bool {
        matches!(self.attribute(NIL_ATTRIBUTE), Some("true") | Some("1"))
    }

    /// Get the trimmed text content, None when absent or whitespace-only
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&XmlNode> {
        self.children
            .iter()
            .filter(|c| c.tag.local_name == local_name)
            .collect()
    }

    /// All descendant elements in document order, excluding this node
    pub fn descendants(&self) -> Vec<&XmlNode> {
        let mut out = Vec::new();
        fn walk<'a>(node: &'a XmlNode, out: &mut Vec<&'a XmlNode>) {
            for child in &node.children {
                out.push(child);
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// Structural equivalence modulo whitespace in text content
    pub fn equivalent(&self, other: &XmlNode) -> bool {
        if self.tag != other.tag || self.attributes != other.attributes {
            return false;
        }
        if self.trimmed_text() != other.trimmed_text() {
            return false;
        }
        self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.equivalent(b))
    }

    /// Parse a single-rooted XML document into a node tree
    pub fn from_str(xml: &str) -> Result<XmlNode> {
        Self::from_str_with_limits(xml, &Limits::default())
    }

    /// Parse with explicit resource limits
    pub fn from_str_with_limits(xml: &str, limits: &Limits) -> Result<XmlNode> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| Error::Xml(e.to_string()))?;
        convert(doc.root_element(), limits, 0)
    }

    /// Serialize this node tree to an XML string
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let name = self.tag.local_name.clone();
        let mut start = BytesStart::new(name.clone());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.trimmed_text().is_none() {
            writer
                .write_event(Event::Empty(start))
                .map_err(|e| Error::Xml(e.to_string()))?;
            return Ok(());
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| Error::Xml(e.to_string()))?;
        if let Some(text) = self.trimmed_text() {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| Error::Xml(e.to_string()))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| Error::Xml(e.to_string()))?;
        Ok(())
    }
}

fn convert(node: roxmltree::Node<'_, '_>, limits: &Limits, depth: usize) -> Result<XmlNode> {
    if depth > limits.max_depth {
        return Err(Error::LimitExceeded(format!(
            "XML nesting depth exceeds {}",
            limits.max_depth
        )));
    }

    let tag = match node.tag_name().namespace() {
        Some(ns) => QName::namespaced(ns, node.tag_name().name()),
        None => QName::local(node.tag_name().name()),
    };

    let mut out = XmlNode::new(tag);
    for attr in node.attributes() {
        out.attributes
            .insert(attr.name().to_string(), attr.value().to_string());
    }
    limits.check_attributes(out.attributes.len())?;

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            out.children.push(convert(child, limits, depth + 1)?);
        } else if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t);
            }
        }
    }
    if !text.trim().is_empty() {
        out.text = Some(text);
    }
    Ok(out)
}
