//! Schema components and the validation machinery

pub mod attributes;
pub mod base;
pub mod builtins;
pub mod complex_types;
pub mod elements;
pub mod groups;
pub mod identities;
pub mod particles;
pub mod registry;
pub mod simple_types;
pub mod validation;

pub use attributes::{AttributeDecl, AttributeGroup};
pub use base::{DecodeState, ValidationMode};
pub use builtins::{AtomicKind, AtomicType, XSD_NAMESPACE};
pub use complex_types::{ComplexType, ContentKind, DerivationFlags, DerivationMethod};
pub use elements::{ElementDecl, ElementScope};
pub use groups::{ElementParticle, GroupParticle, ModelGroup, ModelType};
pub use identities::{FieldValue, IdentityConstraint, IdentityKind};
pub use particles::{Occurs, Particle};
pub use registry::{SchemaRegistry, SchemaType, TypeRef};
pub use simple_types::{RestrictionType, SimpleType};
pub use validation::{ValidationContext, ValidationOutcome};
