//! Error types for xmlbind
//!
//! Two families of errors exist: schema-definition errors, which are raised
//! while the component graph is assembled and are always fatal, and validation
//! errors, which are raised while decoding or encoding an instance and whose
//! severity depends on the validation mode.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlbind Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlbind operations
#[derive(Error, Debug)]
pub enum Error {
    /// Defect in the compiled schema component graph (always fatal)
    #[error("schema definition error: {0}")]
    Schema(#[from] SchemaDefinitionError),

    /// Instance data does not conform to its declared component
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Value error (invalid lexical value for a simple type)
    #[error("value error: {0}")]
    Value(String),

    /// XML parsing or serialization error
    #[error("XML error: {0}")]
    Xml(String),

    /// Resource limit exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

/// Error in a schema component definition.
///
/// These are produced while the component graph is built: conflicting
/// default/fixed values, occurrence bounds on global elements, incompatible
/// substitution-group member types, duplicate global or constraint names.
/// They never result from instance data.
#[derive(Debug, Clone)]
pub struct SchemaDefinitionError {
    /// Error message
    pub message: String,
    /// Name of the offending component
    pub component: Option<String>,
}

impl SchemaDefinitionError {
    /// Create a new schema definition error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            component: None,
        }
    }

    /// Set the offending component name
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }
}

impl fmt::Display for SchemaDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref component) = self.component {
            write!(f, " (component: {})", component)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaDefinitionError {}

/// Classification of instance-time validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// A required attribute is absent
    MissingAttribute,
    /// An undeclared attribute is present
    UnexpectedAttribute,
    /// A declared attribute value failed its simple type
    AttributeTypeError,
    /// A required element particle found no matching child
    TagExpected,
    /// No alternative of a required choice group matched
    NoMatchingAlternative,
    /// A child (or character data) appeared where the content model allows none
    UnexpectedChild,
    /// Two selector scope nodes produced the same key/unique tuple
    DuplicateIdentityValue,
    /// A key constraint field evaluated to a missing value
    MissingKeyField,
    /// A keyref tuple has no counterpart in the referenced constraint
    DanglingKeyref,
    /// Text content failed its simple type
    SimpleContentTypeError,
    /// The recursion depth guard tripped
    DepthExceeded,
}

impl ValidationErrorKind {
    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAttribute => "missing attribute",
            Self::UnexpectedAttribute => "unexpected attribute",
            Self::AttributeTypeError => "attribute type error",
            Self::TagExpected => "tag expected",
            Self::NoMatchingAlternative => "no matching alternative",
            Self::UnexpectedChild => "unexpected child",
            Self::DuplicateIdentityValue => "duplicate identity value",
            Self::MissingKeyField => "missing key field",
            Self::DanglingKeyref => "dangling keyref",
            Self::SimpleContentTypeError => "simple content type error",
            Self::DepthExceeded => "depth exceeded",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instance validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error classification
    pub kind: ValidationErrorKind,
    /// Error message
    message: String,
    /// Reason detail
    pub reason: Option<String>,
    /// Tag of the element under validation
    pub element_tag: Option<String>,
    /// Tags that would have been accepted at the failure point
    pub expected_tags: Vec<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            reason: None,
            element_tag: None,
            expected_tags: Vec::new(),
        }
    }

    /// Set the reason detail
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the element tag
    pub fn with_element(mut self, tag: impl Into<String>) -> Self {
        self.element_tag = Some(tag.into());
        self
    }

    /// Set the expected tags
    pub fn with_expected_tags(mut self, tags: Vec<String>) -> Self {
        self.expected_tags = tags;
        self
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if !self.expected_tags.is_empty() {
            if self.expected_tags.len() == 1 {
                write!(f, " Tag '{}' expected.", self.expected_tags[0])?;
            } else {
                let tags: Vec<_> = self
                    .expected_tags
                    .iter()
                    .map(|t| format!("'{}'", t))
                    .collect();
                write!(f, " Tag ({}) expected.", tags.join(" | "))?;
            }
        }

        if let Some(ref reason) = self.reason {
            write!(f, "\nReason: {}", reason)?;
        }

        if let Some(ref tag) = self.element_tag {
            write!(f, "\nElement: {}", tag)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(
            ValidationErrorKind::TagExpected,
            "content of 'order' is not complete",
        )
        .with_reason("required element not found")
        .with_element("order")
        .with_expected_tags(vec!["item".to_string()]);

        let msg = format!("{}", err);
        assert!(msg.contains("tag expected"));
        assert!(msg.contains("Tag 'item' expected."));
        assert!(msg.contains("Reason:"));
        assert!(msg.contains("Element: order"));
    }

    #[test]
    fn test_validation_error_multiple_expected() {
        let err = ValidationError::new(ValidationErrorKind::NoMatchingAlternative, "no match")
            .with_expected_tags(vec!["a".to_string(), "b".to_string()]);

        let msg = format!("{}", err);
        assert!(msg.contains("Tag ('a' | 'b') expected."));
    }

    #[test]
    fn test_schema_definition_error_display() {
        let err = SchemaDefinitionError::new("'default' and 'fixed' are mutually exclusive")
            .with_component("invoice");

        let msg = format!("{}", err);
        assert!(msg.contains("mutually exclusive"));
        assert!(msg.contains("component: invoice"));
    }

    #[test]
    fn test_error_conversion() {
        let val_err = ValidationError::new(ValidationErrorKind::MissingAttribute, "test");
        let err: Error = val_err.into();
        assert!(matches!(err, Error::Validation(_)));

        let def_err = SchemaDefinitionError::new("test");
        let err: Error = def_err.into();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(ValidationErrorKind::DanglingKeyref.as_str(), "dangling keyref");
        assert_eq!(ValidationErrorKind::MissingAttribute.as_str(), "missing attribute");
    }
}
