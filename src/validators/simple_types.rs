//! Simple type facade
//!
//! Leaf text values go through a `SimpleType` facade: built-in atomics live
//! in `builtins`, and user restrictions layer enumeration and pattern facets
//! on top of a base facade.

use crate::decoded::XsdValue;
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::validators::builtins::collapse_whitespace;
use regex::Regex;
use std::fmt::Debug;
use std::sync::Arc;

/// Facade over a simple (text-only) type.
///
/// Implementations are immutable and shared by reference across concurrent
/// traversals.
pub trait SimpleType: Debug + Send + Sync {
    /// Qualified name of this type
    fn name(&self) -> &QName;

    /// Decode a lexical representation into a typed value
    fn decode(&self, text: &str) -> Result<XsdValue>;

    /// Encode a typed value back into its lexical representation
    fn encode(&self, value: &XsdValue) -> Result<String>;
}

/// A simple type derived by restriction from a base facade
#[derive(Debug)]
pub struct RestrictionType {
    name: QName,
    base: Arc<dyn SimpleType>,
    enumeration: Option<Vec<String>>,
    pattern: Option<Regex>,
}

impl RestrictionType {
    /// Create a restriction of `base` with no facets
    pub fn new(name: QName, base: Arc<dyn SimpleType>) -> Self {
        Self {
            name,
            base,
            enumeration: None,
            pattern: None,
        }
    }

    /// Restrict the value space to an enumeration of lexical values
    pub fn with_enumeration(mut self, values: Vec<String>) -> Self {
        self.enumeration = Some(values);
        self
    }

    /// Restrict the lexical space with a regular expression.
    ///
    /// The pattern is anchored to the whole collapsed value.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{})$", pattern);
        let regex = Regex::new(&anchored)
            .map_err(|e| Error::Value(format!("invalid pattern facet: {}", e)))?;
        self.pattern = Some(regex);
        Ok(self)
    }

    fn check_facets(&self, lexical: &str) -> Result<()> {
        if let Some(ref pattern) = self.pattern {
            if !pattern.is_match(lexical) {
                return Err(Error::Value(format!(
                    "'{}' does not match the pattern of '{}'",
                    lexical, self.name
                )));
            }
        }
        if let Some(ref enumeration) = self.enumeration {
            if !enumeration.iter().any(|v| v == lexical) {
                return Err(Error::Value(format!(
                    "'{}' is not among the enumerated values of '{}'",
                    lexical, self.name
                )));
            }
        }
        Ok(())
    }
}

impl SimpleType for RestrictionType {
    fn name(&self) -> &QName {
        &self.name
    }

    fn decode(&self, text: &str) -> Result<XsdValue> {
        let lexical = collapse_whitespace(text);
        self.check_facets(&lexical)?;
        self.base.decode(&lexical)
    }

    fn encode(&self, value: &XsdValue) -> Result<String> {
        let lexical = self.base.encode(value)?;
        self.check_facets(&lexical)?;
        Ok(lexical)
    }
}
