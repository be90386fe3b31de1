//! XML namespace handling
//!
//! This module provides qualified names (QNames) for the component graph and
//! for instance nodes. Prefix resolution happens upstream in the XML parser;
//! the engine only ever sees resolved namespace URIs.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

static NCNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid NCName pattern"));

/// Check whether a string is a well-formed NCName (no colon, valid start char)
pub fn is_ncname(name: &str) -> bool {
    NCNAME_RE.is_match(name)
}

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName, checking that the local name is a well-formed NCName
    pub fn checked(namespace: Option<&str>, local_name: &str) -> Result<Self> {
        if !is_ncname(local_name) {
            return Err(Error::Value(format!(
                "'{}' is not a valid NCName",
                local_name
            )));
        }
        Ok(Self::new(namespace, local_name))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}
