//! Built-in atomic type facades
//!
//! Leaf text handling delegates to ecosystem codecs: `rust_decimal` for
//! decimals, `chrono` for dates, `base64` for binary content. Each facade
//! normalizes whitespace before parsing, the way the corresponding XSD
//! primitive collapses its lexical space.

use crate::decoded::XsdValue;
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::validators::simple_types::SimpleType;
use base64::Engine;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

/// The XML Schema namespace URI
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Collapse whitespace: trim and fold internal runs to single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Built-in primitive kinds with dedicated codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicKind {
    /// xs:string - any text, preserved as-is
    String,
    /// xs:boolean - true/false/1/0
    Boolean,
    /// xs:integer - whole numbers
    Integer,
    /// xs:decimal - arbitrary-precision decimals
    Decimal,
    /// xs:date - calendar dates
    Date,
    /// xs:base64Binary - base64-encoded bytes
    Base64Binary,
    /// xs:token - whitespace-collapsed text
    Token,
}

/// A built-in atomic simple type
#[derive(Debug, Clone)]
pub struct AtomicType {
    name: QName,
    kind: AtomicKind,
}

impl AtomicType {
    fn builtin(local_name: &str, kind: AtomicKind) -> Arc<dyn SimpleType> {
        Arc::new(Self {
            name: QName::namespaced(XSD_NAMESPACE, local_name),
            kind,
        })
    }

    /// The xs:string facade
    pub fn string() -> Arc<dyn SimpleType> {
        Self::builtin("string", AtomicKind::String)
    }

    /// The xs:boolean facade
    pub fn boolean() -> Arc<dyn SimpleType> {
        Self::builtin("boolean", AtomicKind::Boolean)
    }

    /// The xs:integer facade
    pub fn integer() -> Arc<dyn SimpleType> {
        Self::builtin("integer", AtomicKind::Integer)
    }

    /// The xs:decimal facade
    pub fn decimal() -> Arc<dyn SimpleType> {
        Self::builtin("decimal", AtomicKind::Decimal)
    }

    /// The xs:date facade
    pub fn date() -> Arc<dyn SimpleType> {
        Self::builtin("date", AtomicKind::Date)
    }

    /// The xs:base64Binary facade
    pub fn base64_binary() -> Arc<dyn SimpleType> {
        Self::builtin("base64Binary", AtomicKind::Base64Binary)
    }

    /// The xs:token facade
    pub fn token() -> Arc<dyn SimpleType> {
        Self::builtin("token", AtomicKind::Token)
    }

    /// The primitive kind of this facade
    pub fn kind(&self) -> AtomicKind {
        self.kind
    }
}

impl SimpleType for AtomicType {
    fn name(&self) -> &QName {
        &self.name
    }

    fn decode(&self, text: &str) -> Result<XsdValue> {
        match self.kind {
            AtomicKind::String => Ok(XsdValue::String(text.to_string())),
            AtomicKind::Token => Ok(XsdValue::String(collapse_whitespace(text))),
            AtomicKind::Boolean => match collapse_whitespace(text).as_str() {
                "true" | "1" => Ok(XsdValue::Boolean(true)),
                "false" | "0" => Ok(XsdValue::Boolean(false)),
                other => Err(Error::Value(format!(
                    "'{}' is not a valid boolean",
                    other
                ))),
            },
            AtomicKind::Integer => {
                let lexical = collapse_whitespace(text);
                lexical
                    .parse::<i64>()
                    .map(XsdValue::Integer)
                    .map_err(|_| Error::Value(format!("'{}' is not a valid integer", lexical)))
            }
            AtomicKind::Decimal => {
                let lexical = collapse_whitespace(text);
                Decimal::from_str(&lexical)
                    .map(XsdValue::Decimal)
                    .map_err(|_| Error::Value(format!("'{}' is not a valid decimal", lexical)))
            }
            AtomicKind::Date => {
                let lexical = collapse_whitespace(text);
                NaiveDate::parse_from_str(&lexical, "%Y-%m-%d")
                    .map(XsdValue::Date)
                    .map_err(|_| Error::Value(format!("'{}' is not a valid date", lexical)))
            }
            AtomicKind::Base64Binary => {
                // base64 ignores no whitespace by itself, collapse first
                let lexical: String = text.split_whitespace().collect();
                base64::engine::general_purpose::STANDARD
                    .decode(lexical.as_bytes())
                    .map(XsdValue::Binary)
                    .map_err(|_| Error::Value("invalid base64 content".to_string()))
            }
        }
    }

    fn encode(&self, value: &XsdValue) -> Result<String> {
        let compatible = matches!(
            (self.kind, value),
            (AtomicKind::String | AtomicKind::Token, XsdValue::String(_))
                | (AtomicKind::Boolean, XsdValue::Boolean(_))
                | (AtomicKind::Integer, XsdValue::Integer(_))
                | (AtomicKind::Decimal, XsdValue::Decimal(_) | XsdValue::Integer(_))
                | (AtomicKind::Date, XsdValue::Date(_))
                | (AtomicKind::Base64Binary, XsdValue::Binary(_))
        );
        if !compatible {
            return Err(Error::Value(format!(
                "value {:?} cannot be encoded as {}",
                value,
                self.name.local_name
            )));
        }
        Ok(value.to_lexical())
    }
}
