//! # xmlbind
//!
//! Schema-driven XML validation and data binding over a compiled schema
//! component graph. Given element declarations, types and content models
//! registered in a [`SchemaRegistry`], the engine validates an XML element
//! instance against its declared component, decodes it into a typed
//! [`DecodedValue`], and encodes such a value back into a conforming
//! element.
//!
//! Three validation modes are threaded through every traversal:
//! [`ValidationMode::Strict`] stops at the first error, [`ValidationMode::Lax`]
//! collects all errors while returning a best-effort value, and
//! [`ValidationMode::Skip`] decodes structurally with no semantic checks.
//!
//! ## Example
//!
//! ```
//! use xmlbind::{
//!     AtomicType, ElementDecl, QName, SchemaRegistry, TypeRef, ValidationMode, XmlNode,
//! };
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register_element(ElementDecl::new(
//!     QName::local("qty"),
//!     TypeRef::simple(AtomicType::integer()),
//! ));
//! registry.build().unwrap();
//!
//! let node = XmlNode::from_str("<qty>5</qty>").unwrap();
//! let (decoded, errors) = registry.decode(&node, ValidationMode::Strict).unwrap();
//! assert!(errors.is_empty());
//! assert_eq!(decoded.to_json().unwrap(), r#"{"tag":"qty","$":5}"#);
//! ```

#![warn(missing_docs)]

pub mod decoded;
pub mod error;
pub mod limits;
pub mod namespaces;
pub mod nodes;
pub mod validators;

pub use decoded::{DecodedValue, XsdValue};
pub use error::{
    Error, Result, SchemaDefinitionError, ValidationError, ValidationErrorKind,
};
pub use limits::Limits;
pub use namespaces::QName;
pub use nodes::{XmlNode, NIL_ATTRIBUTE};
pub use validators::{
    AtomicType, AttributeDecl, AttributeGroup, ComplexType, ContentKind, DecodeState,
    DerivationFlags, DerivationMethod, ElementDecl, ElementParticle, ElementScope, GroupParticle,
    IdentityConstraint, IdentityKind, ModelGroup, ModelType, Occurs, Particle, RestrictionType,
    SchemaRegistry, SchemaType, SimpleType, TypeRef, ValidationContext, ValidationMode,
    ValidationOutcome, XSD_NAMESPACE,
};
