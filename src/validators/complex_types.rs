//! Complex type definitions
//!
//! A complex type owns an attribute group and a content kind: empty, simple
//! (text through a simple type facade), element-only, or mixed. Derivation
//! from a base type records the method so compatibility can be checked
//! against the base's final restriction.

use crate::error::{Result, SchemaDefinitionError};
use crate::namespaces::QName;
use crate::validators::attributes::AttributeGroup;
use crate::validators::groups::ModelGroup;
use crate::validators::registry::{SchemaRegistry, SchemaType};
use crate::validators::simple_types::SimpleType;
use std::sync::Arc;

/// Cap on base-type chain walks, guards against cyclic definitions
const MAX_DERIVATION_DEPTH: usize = 64;

/// How a type derives from its base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// Structural widening of the base
    Extension,
    /// Structural narrowing of the base
    Restriction,
}

impl DerivationMethod {
    /// Get the method as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::Restriction => "restriction",
        }
    }
}

/// final/block flags restricting further derivation or substitution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivationFlags {
    /// Restriction is forbidden
    pub restriction: bool,
    /// Extension is forbidden
    pub extension: bool,
}

impl DerivationFlags {
    /// No derivation forbidden
    pub fn none() -> Self {
        Self::default()
    }

    /// All derivation forbidden (final="#all")
    pub fn all() -> Self {
        Self {
            restriction: true,
            extension: true,
        }
    }

    /// Only extension forbidden
    pub fn extension_only() -> Self {
        Self {
            restriction: false,
            extension: true,
        }
    }

    /// Only restriction forbidden
    pub fn restriction_only() -> Self {
        Self {
            restriction: true,
            extension: false,
        }
    }

    /// True when the given method is forbidden by these flags
    pub fn is_blocked(&self, method: DerivationMethod) -> bool {
        match method {
            DerivationMethod::Extension => self.extension,
            DerivationMethod::Restriction => self.restriction,
        }
    }
}

/// The content variant of a complex type
#[derive(Debug, Clone)]
pub enum ContentKind {
    /// No children, no text
    Empty,
    /// Text content through a simple type facade, no children
    Simple(Arc<dyn SimpleType>),
    /// Children through a content model group, no text
    ElementOnly(Arc<ModelGroup>),
    /// Children through a content model group, text allowed
    Mixed(Arc<ModelGroup>),
}

impl ContentKind {
    /// The content model group, when this kind has one
    pub fn group(&self) -> Option<&Arc<ModelGroup>> {
        match self {
            Self::ElementOnly(group) | Self::Mixed(group) => Some(group),
            _ => None,
        }
    }

    /// True when text content is admissible
    pub fn admits_text(&self) -> bool {
        matches!(self, Self::Simple(_) | Self::Mixed(_))
    }
}

/// A complex type: attribute group plus content
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Type name, None for anonymous local types
    pub name: Option<QName>,
    /// Content variant
    pub content: ContentKind,
    /// Declared attribute uses
    pub attributes: AttributeGroup,
    /// Base type name when derived
    pub base_type: Option<QName>,
    /// Derivation method when derived
    pub derivation: Option<DerivationMethod>,
    /// Derivations forbidden from this type
    pub final_flags: DerivationFlags,
}

impl ComplexType {
    /// Create an empty-content complex type
    pub fn new(name: Option<QName>) -> Self {
        Self {
            name,
            content: ContentKind::Empty,
            attributes: AttributeGroup::new(),
            base_type: None,
            derivation: None,
            final_flags: DerivationFlags::none(),
        }
    }

    /// Set the content variant
    pub fn with_content(mut self, content: ContentKind) -> Self {
        self.content = content;
        self
    }

    /// Set the attribute group
    pub fn with_attributes(mut self, attributes: AttributeGroup) -> Self {
        self.attributes = attributes;
        self
    }

    /// Record derivation from a base type
    pub fn with_base(mut self, base: QName, method: DerivationMethod) -> Self {
        self.base_type = Some(base);
        self.derivation = Some(method);
        self
    }

    /// Forbid further derivation
    pub fn with_final(mut self, flags: DerivationFlags) -> Self {
        self.final_flags = flags;
        self
    }

    /// Walk the base chain checking whether this type derives from `base`
    pub fn is_derived_from(&self, base: &QName, registry: &SchemaRegistry) -> bool {
        let mut current = self.base_type.clone();
        for _ in 0..MAX_DERIVATION_DEPTH {
            match current {
                None => return false,
                Some(name) => {
                    if &name == base {
                        return true;
                    }
                    current = match registry.lookup_type(&name) {
                        Some(SchemaType::Complex(ct)) => ct.base_type.clone(),
                        _ => None,
                    };
                }
            }
        }
        false
    }

    /// Check this type's derivation against its base: the base's final
    /// restriction, and for restrictions with content models, that the
    /// restricted group's occurrence bounds fit within the base's
    pub fn check_derivation(&self, registry: &SchemaRegistry) -> Result<()> {
        let (Some(base_name), Some(method)) = (&self.base_type, self.derivation) else {
            return Ok(());
        };
        let component = || {
            self.name
                .as_ref()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "<anonymous>".to_string())
        };
        if let Some(SchemaType::Complex(base)) = registry.lookup_type(base_name) {
            if base.final_flags.is_blocked(method) {
                return Err(SchemaDefinitionError::new(format!(
                    "derivation by {} from '{}' is forbidden by its final restriction",
                    method.as_str(),
                    base_name
                ))
                .with_component(component())
                .into());
            }
            if method == DerivationMethod::Restriction {
                if let (Some(group), Some(base_group)) =
                    (self.content.group(), base.content.group())
                {
                    if !group.occurs.has_occurs_restriction(&base_group.occurs) {
                        return Err(SchemaDefinitionError::new(format!(
                            "occurrence bounds {} of the restricted content model do not fit within the base's {}",
                            group.occurs, base_group.occurs
                        ))
                        .with_component(component())
                        .into());
                    }
                }
            }
        }
        Ok(())
    }
}
