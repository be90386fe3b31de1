//! Attribute declarations and attribute groups

use crate::decoded::XsdValue;
use crate::error::{
    Error, Result, SchemaDefinitionError, ValidationError, ValidationErrorKind,
};
use crate::validators::simple_types::SimpleType;
use crate::validators::validation::ValidationContext;
use indexmap::IndexMap;
use std::sync::Arc;

/// A declared attribute use
#[derive(Debug, Clone)]
pub struct AttributeDecl {
    /// Attribute local name
    pub name: String,
    /// Simple type of the attribute value
    pub simple_type: Arc<dyn SimpleType>,
    /// Whether the attribute must be present
    pub required: bool,
    /// Default value applied when the attribute is absent
    pub default: Option<String>,
    /// Fixed value the attribute must carry when present
    pub fixed: Option<String>,
}

impl AttributeDecl {
    /// Create an optional attribute declaration
    pub fn new(name: impl Into<String>, simple_type: Arc<dyn SimpleType>) -> Self {
        Self {
            name: name.into(),
            simple_type,
            required: false,
            default: None,
            fixed: None,
        }
    }

    /// Mark the attribute as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set a default value; conflicts with a fixed value
    pub fn with_default(mut self, value: impl Into<String>) -> Result<Self> {
        if self.fixed.is_some() {
            return Err(SchemaDefinitionError::new(
                "'default' and 'fixed' attributes are mutually exclusive",
            )
            .with_component(&self.name)
            .into());
        }
        self.default = Some(value.into());
        Ok(self)
    }

    /// Set a fixed value; conflicts with a default value
    pub fn with_fixed(mut self, value: impl Into<String>) -> Result<Self> {
        if self.default.is_some() {
            return Err(SchemaDefinitionError::new(
                "'default' and 'fixed' attributes are mutually exclusive",
            )
            .with_component(&self.name)
            .into());
        }
        self.fixed = Some(value.into());
        Ok(self)
    }

    /// The value applied when the attribute is absent from the instance
    pub fn absent_value(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.default.as_deref())
    }

    /// Decode an instance value, enforcing the fixed constraint
    pub fn validate_value(&self, text: &str) -> Result<XsdValue> {
        if let Some(ref fixed) = self.fixed {
            if text.trim() != fixed {
                return Err(Error::Value(format!(
                    "attribute '{}' must have the fixed value '{}'",
                    self.name, fixed
                )));
            }
        }
        self.simple_type.decode(text)
    }
}

/// The attribute uses of a complex type, unique by name
#[derive(Debug, Clone, Default)]
pub struct AttributeGroup {
    attributes: IndexMap<String, AttributeDecl>,
}

impl AttributeGroup {
    /// Create an empty attribute group
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute declaration; duplicate names are a definition error
    pub fn add(&mut self, decl: AttributeDecl) -> Result<()> {
        if self.attributes.contains_key(&decl.name) {
            return Err(SchemaDefinitionError::new(format!(
                "duplicate attribute declaration '{}'",
                decl.name
            ))
            .into());
        }
        self.attributes.insert(decl.name.clone(), decl);
        Ok(())
    }

    /// Look up a declared attribute by name
    pub fn get(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.get(name)
    }

    /// Number of declared attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when no attributes are declared
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Decode instance attributes into typed values.
    ///
    /// Declared attributes are visited first in declaration order (missing
    /// required ones and type failures surface here), then any undeclared
    /// instance attribute is reported.
    pub fn decode(
        &self,
        attributes: &IndexMap<String, String>,
        ctx: &mut ValidationContext,
    ) -> Result<IndexMap<String, XsdValue>> {
        let mut decoded = IndexMap::new();
        for decl in self.attributes.values() {
            match attributes.get(&decl.name) {
                Some(text) => match decl.validate_value(text) {
                    Ok(value) => {
                        decoded.insert(decl.name.clone(), value);
                    }
                    Err(error) => {
                        ctx.raise_or_collect(
                            ValidationError::new(
                                ValidationErrorKind::AttributeTypeError,
                                format!("invalid value for attribute '{}'", decl.name),
                            )
                            .with_reason(error.to_string()),
                        )?;
                    }
                },
                None if decl.required => {
                    ctx.raise_or_collect(ValidationError::new(
                        ValidationErrorKind::MissingAttribute,
                        format!("missing required attribute '{}'", decl.name),
                    ))?;
                }
                None => {
                    if ctx.use_defaults {
                        if let Some(absent) = decl.absent_value() {
                            match decl.simple_type.decode(absent) {
                                Ok(value) => {
                                    decoded.insert(decl.name.clone(), value);
                                }
                                Err(error) => {
                                    ctx.raise_or_collect(
                                        ValidationError::new(
                                            ValidationErrorKind::AttributeTypeError,
                                            format!(
                                                "invalid default value for attribute '{}'",
                                                decl.name
                                            ),
                                        )
                                        .with_reason(error.to_string()),
                                    )?;
                                }
                            }
                        }
                    }
                }
            }
        }

        for name in attributes.keys() {
            if !self.attributes.contains_key(name) {
                ctx.raise_or_collect(ValidationError::new(
                    ValidationErrorKind::UnexpectedAttribute,
                    format!("attribute '{}' is not declared", name),
                ))?;
            }
        }

        Ok(decoded)
    }

    /// Encode typed attribute values back into lexical form
    pub fn encode(
        &self,
        values: &IndexMap<String, XsdValue>,
        ctx: &mut ValidationContext,
    ) -> Result<IndexMap<String, String>> {
        let mut encoded = IndexMap::new();
        for decl in self.attributes.values() {
            match values.get(&decl.name) {
                Some(value) => match decl.simple_type.encode(value) {
                    Ok(lexical) => {
                        if let Some(ref fixed) = decl.fixed {
                            if &lexical != fixed {
                                ctx.raise_or_collect(ValidationError::new(
                                    ValidationErrorKind::AttributeTypeError,
                                    format!(
                                        "attribute '{}' must have the fixed value '{}'",
                                        decl.name, fixed
                                    ),
                                ))?;
                                continue;
                            }
                        }
                        encoded.insert(decl.name.clone(), lexical);
                    }
                    Err(error) => {
                        ctx.raise_or_collect(
                            ValidationError::new(
                                ValidationErrorKind::AttributeTypeError,
                                format!("cannot encode attribute '{}'", decl.name),
                            )
                            .with_reason(error.to_string()),
                        )?;
                    }
                },
                None if decl.required => {
                    ctx.raise_or_collect(ValidationError::new(
                        ValidationErrorKind::MissingAttribute,
                        format!("missing required attribute '{}'", decl.name),
                    ))?;
                }
                None => {}
            }
        }

        for name in values.keys() {
            if !self.attributes.contains_key(name) {
                ctx.raise_or_collect(ValidationError::new(
                    ValidationErrorKind::UnexpectedAttribute,
                    format!("attribute '{}' is not declared", name),
                ))?;
            }
        }

        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::base::ValidationMode;
    use crate::validators::builtins::AtomicType;

    fn group() -> AttributeGroup {
        let mut group = AttributeGroup::new();
        group
            .add(AttributeDecl::new("id", AtomicType::integer()).required())
            .unwrap();
        group
            .add(
                AttributeDecl::new("unit", AtomicType::string())
                    .with_default("pcs")
                    .unwrap(),
            )
            .unwrap();
        group
    }

    fn instance(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_fixed_exclusive() {
        let decl = AttributeDecl::new("id", AtomicType::string())
            .with_fixed("x")
            .unwrap();
        assert!(decl.with_default("y").is_err());
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut group = group();
        assert!(group
            .add(AttributeDecl::new("id", AtomicType::string()))
            .is_err());
    }

    #[test]
    fn test_decode_with_defaulting() {
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        let decoded = group().decode(&instance(&[("id", "42")]), &mut ctx).unwrap();

        assert_eq!(decoded.get("id"), Some(&XsdValue::Integer(42)));
        assert_eq!(decoded.get("unit"), Some(&XsdValue::String("pcs".into())));
    }

    #[test]
    fn test_missing_required_strict() {
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        let result = group().decode(&instance(&[]), &mut ctx);
        assert!(matches!(
            result,
            Err(Error::Validation(ref e)) if e.kind == ValidationErrorKind::MissingAttribute
        ));
    }

    #[test]
    fn test_lax_collects_all() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        group()
            .decode(&instance(&[("extra", "x")]), &mut ctx)
            .unwrap();

        let kinds: Vec<_> = ctx.errors().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ValidationErrorKind::MissingAttribute,
                ValidationErrorKind::UnexpectedAttribute,
            ]
        );
    }

    #[test]
    fn test_type_error() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        group()
            .decode(&instance(&[("id", "not-a-number")]), &mut ctx)
            .unwrap();
        assert_eq!(ctx.errors()[0].kind, ValidationErrorKind::AttributeTypeError);
    }

    #[test]
    fn test_fixed_value_enforced() {
        let mut group = AttributeGroup::new();
        group
            .add(
                AttributeDecl::new("version", AtomicType::string())
                    .with_fixed("1.0")
                    .unwrap(),
            )
            .unwrap();

        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        group
            .decode(&instance(&[("version", "2.0")]), &mut ctx)
            .unwrap();
        assert_eq!(ctx.errors()[0].kind, ValidationErrorKind::AttributeTypeError);

        // an absent fixed attribute decodes to the fixed value
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        let decoded = group.decode(&instance(&[]), &mut ctx).unwrap();
        assert_eq!(decoded.get("version"), Some(&XsdValue::String("1.0".into())));
    }

    #[test]
    fn test_encode_roundtrip() {
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        let decoded = group().decode(&instance(&[("id", "42")]), &mut ctx).unwrap();
        let encoded = group().encode(&decoded, &mut ctx).unwrap();

        assert_eq!(encoded.get("id").map(String::as_str), Some("42"));
        assert_eq!(encoded.get("unit").map(String::as_str), Some("pcs"));
    }

    #[test]
    fn test_skip_ignores_everything() {
        let mut ctx = ValidationContext::new(ValidationMode::Skip);
        group()
            .decode(&instance(&[("extra", "x")]), &mut ctx)
            .unwrap();
        assert!(ctx.errors().is_empty());
    }
}
