//! Identity constraints (unique, key, keyref)
//!
//! Selector and field paths cover the restricted subset identity constraints
//! need: `.`, child steps separated by `/`, an optional leading `.//`
//! descendant prefix, and field terminals `@attr` or `text()`. This is not a
//! general XPath evaluator.

use crate::error::{Error, Result, ValidationError, ValidationErrorKind};
use crate::namespaces::QName;
use crate::nodes::XmlNode;
use crate::validators::validation::ValidationContext;
use std::collections::HashSet;
use std::fmt;

/// One component of an identity tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    /// The field resolved to a value
    String(String),
    /// The field resolved to nothing
    Null,
}

impl FieldValue {
    /// True for the absent value
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{}'", s),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A tuple of field values produced by one selector scope node
pub type FieldTuple = Vec<FieldValue>;

fn render_tuple(tuple: &FieldTuple) -> String {
    let parts: Vec<_> = tuple.iter().map(|v| v.to_string()).collect();
    format!("({})", parts.join(", "))
}

/// Selector path: picks the scope nodes below the declaring element
#[derive(Debug, Clone)]
pub struct SelectorPath {
    descendant: bool,
    steps: Vec<String>,
}

impl SelectorPath {
    /// Parse a selector expression
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(Error::Value("empty selector expression".to_string()));
        }
        let (descendant, rest) = match expr.strip_prefix(".//") {
            Some(rest) => (true, rest),
            None => (false, expr),
        };
        let mut steps = Vec::new();
        for step in rest.split('/') {
            let step = step.trim();
            if step == "." || step.is_empty() {
                continue;
            }
            if step.starts_with('@') || step.contains('(') {
                return Err(Error::Value(format!(
                    "'{}' is not allowed in a selector expression",
                    step
                )));
            }
            steps.push(step.to_string());
        }
        Ok(Self { descendant, steps })
    }

    /// Evaluate the selector against the declaring element
    pub fn select<'a>(&self, root: &'a XmlNode) -> Vec<&'a XmlNode> {
        let mut current: Vec<&XmlNode> = if self.descendant {
            let mut nodes = vec![root];
            nodes.extend(root.descendants());
            nodes
        } else {
            vec![root]
        };
        for step in &self.steps {
            current = current
                .into_iter()
                .flat_map(|node| node.find_children(step))
                .collect();
        }
        current
    }
}

/// The terminal of a field path
#[derive(Debug, Clone)]
enum FieldTerminal {
    Attribute(String),
    Text,
}

/// Field path: produces one tuple component per scope node
#[derive(Debug, Clone)]
pub struct FieldPath {
    steps: Vec<String>,
    terminal: FieldTerminal,
}

impl FieldPath {
    /// Parse a field expression
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(Error::Value("empty field expression".to_string()));
        }
        let mut segments: Vec<&str> = expr
            .split('/')
            .map(str::trim)
            .filter(|s| *s != "." && !s.is_empty())
            .collect();

        let terminal = match segments.last() {
            Some(&"text()") => {
                segments.pop();
                FieldTerminal::Text
            }
            Some(last) if last.starts_with('@') => {
                let name = last[1..].to_string();
                if name.is_empty() {
                    return Err(Error::Value("empty attribute name in field".to_string()));
                }
                segments.pop();
                FieldTerminal::Attribute(name)
            }
            _ => FieldTerminal::Text,
        };

        for segment in &segments {
            if segment.starts_with('@') || segment.contains('(') {
                return Err(Error::Value(format!(
                    "'{}' may only appear as the last step of a field",
                    segment
                )));
            }
        }

        Ok(Self {
            steps: segments.into_iter().map(String::from).collect(),
            terminal,
        })
    }

    /// Evaluate the field against a scope node
    pub fn evaluate(&self, node: &XmlNode) -> FieldValue {
        let mut current = node;
        for step in &self.steps {
            match current.find_children(step).first() {
                Some(child) => current = child,
                None => return FieldValue::Null,
            }
        }
        match &self.terminal {
            FieldTerminal::Attribute(name) => match current.attribute(name) {
                Some(value) => FieldValue::String(value.trim().to_string()),
                None => FieldValue::Null,
            },
            FieldTerminal::Text => match current.trimmed_text() {
                Some(text) => FieldValue::String(text.to_string()),
                None => FieldValue::Null,
            },
        }
    }
}

/// The three identity constraint variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// Tuples must be unique; null fields exempt a node
    Unique,
    /// Tuples must be unique and fully populated
    Key,
    /// Tuples must match a referenced key/unique constraint
    Keyref,
}

impl IdentityKind {
    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Key => "key",
            Self::Keyref => "keyref",
        }
    }
}

/// A compiled identity constraint
#[derive(Debug, Clone)]
pub struct IdentityConstraint {
    /// Constraint name, unique per schema
    pub name: QName,
    /// Variant of this constraint
    pub kind: IdentityKind,
    /// Referenced key/unique constraint (keyref only)
    pub refer: Option<QName>,
    selector: SelectorPath,
    fields: Vec<FieldPath>,
}

impl IdentityConstraint {
    fn build(
        name: QName,
        kind: IdentityKind,
        refer: Option<QName>,
        selector: &str,
        fields: &[&str],
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::Value(format!(
                "identity constraint '{}' declares no fields",
                name
            )));
        }
        Ok(Self {
            name,
            kind,
            refer,
            selector: SelectorPath::parse(selector)?,
            fields: fields
                .iter()
                .map(|f| FieldPath::parse(f))
                .collect::<Result<_>>()?,
        })
    }

    /// Create a unique constraint
    pub fn unique(name: QName, selector: &str, fields: &[&str]) -> Result<Self> {
        Self::build(name, IdentityKind::Unique, None, selector, fields)
    }

    /// Create a key constraint
    pub fn key(name: QName, selector: &str, fields: &[&str]) -> Result<Self> {
        Self::build(name, IdentityKind::Key, None, selector, fields)
    }

    /// Create a keyref constraint referencing a key/unique by name
    pub fn keyref(name: QName, refer: QName, selector: &str, fields: &[&str]) -> Result<Self> {
        Self::build(name, IdentityKind::Keyref, Some(refer), selector, fields)
    }

    /// Produce the tuple of every selector scope node under `root`
    pub fn tuples<'a>(&self, root: &'a XmlNode) -> Vec<(&'a XmlNode, FieldTuple)> {
        self.selector
            .select(root)
            .into_iter()
            .map(|node| {
                let tuple = self.fields.iter().map(|f| f.evaluate(node)).collect();
                (node, tuple)
            })
            .collect()
    }

    /// Evaluate this constraint over one declaring element's subtree.
    ///
    /// Uniqueness is scoped to `root`: two instances of the declaring element
    /// each get their own tuple space, so a value repeated across sibling
    /// scopes is not a duplicate. Key and unique tuples are also recorded
    /// into the context so keyrefs evaluated later in the same invocation
    /// can resolve them.
    pub fn evaluate(&self, root: &XmlNode, ctx: &mut ValidationContext) -> Result<()> {
        match self.kind {
            IdentityKind::Unique => {
                let mut seen: HashSet<FieldTuple> = HashSet::new();
                for (node, tuple) in self.tuples(root) {
                    if tuple.iter().any(FieldValue::is_null) {
                        continue;
                    }
                    if !seen.insert(tuple.clone()) {
                        ctx.raise_or_collect(
                            ValidationError::new(
                                ValidationErrorKind::DuplicateIdentityValue,
                                format!(
                                    "duplicated value {} for constraint '{}'",
                                    render_tuple(&tuple),
                                    self.name
                                ),
                            )
                            .with_element(node.tag.to_string()),
                        )?;
                        continue;
                    }
                    ctx.record_identity(&self.name, tuple);
                }
            }
            IdentityKind::Key => {
                let mut seen: HashSet<FieldTuple> = HashSet::new();
                for (node, tuple) in self.tuples(root) {
                    if tuple.iter().any(FieldValue::is_null) {
                        ctx.raise_or_collect(
                            ValidationError::new(
                                ValidationErrorKind::MissingKeyField,
                                format!(
                                    "missing field value for key '{}', got {}",
                                    self.name,
                                    render_tuple(&tuple)
                                ),
                            )
                            .with_element(node.tag.to_string()),
                        )?;
                        continue;
                    }
                    if !seen.insert(tuple.clone()) {
                        ctx.raise_or_collect(
                            ValidationError::new(
                                ValidationErrorKind::DuplicateIdentityValue,
                                format!(
                                    "duplicated value {} for key '{}'",
                                    render_tuple(&tuple),
                                    self.name
                                ),
                            )
                            .with_element(node.tag.to_string()),
                        )?;
                        continue;
                    }
                    ctx.record_identity(&self.name, tuple);
                }
            }
            IdentityKind::Keyref => {
                // refer is checked at build time, absent only for a registry
                // that was never built
                let Some(refer) = self.refer.as_ref() else {
                    return Ok(());
                };
                for (node, tuple) in self.tuples(root) {
                    if tuple.iter().any(FieldValue::is_null) {
                        continue;
                    }
                    if !ctx.has_identity(refer, &tuple) {
                        ctx.raise_or_collect(
                            ValidationError::new(
                                ValidationErrorKind::DanglingKeyref,
                                format!(
                                    "value {} of keyref '{}' not found in '{}'",
                                    render_tuple(&tuple),
                                    self.name,
                                    refer
                                ),
                            )
                            .with_element(node.tag.to_string()),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::base::ValidationMode;

    fn orders() -> XmlNode {
        XmlNode::from_str(
            r#"<orders>
                <order id="1"><sku>A</sku></order>
                <order id="2"><sku>B</sku></order>
                <line ref="1"/>
                <line ref="3"/>
            </orders>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_selector_child_steps() {
        let selector = SelectorPath::parse("order").unwrap();
        assert_eq!(selector.select(&orders()).len(), 2);

        let selector = SelectorPath::parse("./order/sku").unwrap();
        assert_eq!(selector.select(&orders()).len(), 2);
    }

    #[test]
    fn test_selector_descendant() {
        let selector = SelectorPath::parse(".//sku").unwrap();
        assert_eq!(selector.select(&orders()).len(), 2);
    }

    #[test]
    fn test_selector_rejects_attributes() {
        assert!(SelectorPath::parse("order/@id").is_err());
        assert!(SelectorPath::parse("").is_err());
    }

    #[test]
    fn test_field_evaluation() {
        let root = orders();
        let order = &root.children[0];

        assert_eq!(
            FieldPath::parse("@id").unwrap().evaluate(order),
            FieldValue::String("1".to_string())
        );
        assert_eq!(
            FieldPath::parse("sku/text()").unwrap().evaluate(order),
            FieldValue::String("A".to_string())
        );
        assert_eq!(
            FieldPath::parse("sku").unwrap().evaluate(order),
            FieldValue::String("A".to_string())
        );
        assert_eq!(
            FieldPath::parse("@missing").unwrap().evaluate(order),
            FieldValue::Null
        );
    }

    #[test]
    fn test_field_rejects_inner_attribute_step() {
        assert!(FieldPath::parse("@id/sku").is_err());
    }

    #[test]
    fn test_unique_detects_duplicates() {
        let root = XmlNode::from_str(
            r#"<r><p n="x" v="1"/><p n="y" v="2"/><p n="x" v="1"/></r>"#,
        )
        .unwrap();
        let constraint =
            IdentityConstraint::unique(QName::local("pU"), "p", &["@n", "@v"]).unwrap();

        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        constraint.evaluate(&root, &mut ctx).unwrap();

        let kinds: Vec<_> = ctx.errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ValidationErrorKind::DuplicateIdentityValue]);
    }

    #[test]
    fn test_uniqueness_is_local_to_the_evaluated_root() {
        let shelf = XmlNode::from_str(r#"<shelf><book id="1"/></shelf>"#).unwrap();
        let constraint =
            IdentityConstraint::unique(QName::local("bookU"), "book", &["@id"]).unwrap();

        // two declaring instances may carry the same tuple
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        constraint.evaluate(&shelf, &mut ctx).unwrap();
        constraint.evaluate(&shelf, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_unique_skips_null_fields() {
        let root = XmlNode::from_str(r#"<r><p/><p/></r>"#).unwrap();
        let constraint = IdentityConstraint::unique(QName::local("pU"), "p", &["@n"]).unwrap();

        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        constraint.evaluate(&root, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_key_rejects_null_fields() {
        let root = XmlNode::from_str(r#"<r><p n="x"/><p/></r>"#).unwrap();
        let constraint = IdentityConstraint::key(QName::local("pK"), "p", &["@n"]).unwrap();

        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        constraint.evaluate(&root, &mut ctx).unwrap();

        let kinds: Vec<_> = ctx.errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ValidationErrorKind::MissingKeyField]);
    }

    #[test]
    fn test_keyref_resolution() {
        let root = orders();
        let key = IdentityConstraint::key(QName::local("orderKey"), "order", &["@id"]).unwrap();
        let keyref = IdentityConstraint::keyref(
            QName::local("lineRef"),
            QName::local("orderKey"),
            "line",
            &["@ref"],
        )
        .unwrap();

        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        key.evaluate(&root, &mut ctx).unwrap();
        keyref.evaluate(&root, &mut ctx).unwrap();

        let kinds: Vec<_> = ctx.errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ValidationErrorKind::DanglingKeyref]);
        assert!(ctx.errors()[0].message().contains("'3'"));
    }

    #[test]
    fn test_constraint_needs_fields() {
        assert!(IdentityConstraint::unique(QName::local("u"), "p", &[]).is_err());
    }
}
