//! Schema component registry
//!
//! All compiled components live here for the schema's lifetime. Cross
//! references between components are name-keyed lookups into the registry
//! rather than owning edges, which keeps the component graph acyclic even
//! when a type's content model eventually references an element of that same
//! type. `build()` runs every compile-time check, collecting one error per
//! offending component while it keeps checking siblings.

use crate::decoded::DecodedValue;
use crate::error::{
    Error, Result, SchemaDefinitionError, ValidationError, ValidationErrorKind,
};
use crate::namespaces::QName;
use crate::nodes::XmlNode;
use crate::validators::base::ValidationMode;
use crate::validators::complex_types::ComplexType;
use crate::validators::elements::ElementDecl;
use crate::validators::groups::{GroupParticle, ModelGroup, ModelType};
use crate::validators::identities::{IdentityConstraint, IdentityKind};
use crate::validators::simple_types::SimpleType;
use crate::validators::validation::{ValidationContext, ValidationOutcome};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Cap on base-type chain walks during compatibility checks
const MAX_CHAIN_DEPTH: usize = 64;

/// A registered type: simple facade or complex definition
#[derive(Debug, Clone)]
pub enum SchemaType {
    /// A simple (text-only) type
    Simple(Arc<dyn SimpleType>),
    /// A complex type
    Complex(Arc<ComplexType>),
}

impl SchemaType {
    /// The declared name of this type, if any
    pub fn name(&self) -> Option<QName> {
        match self {
            Self::Simple(st) => Some(st.name().clone()),
            Self::Complex(ct) => ct.name.clone(),
        }
    }
}

/// Reference from an element declaration to its type
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// Name-keyed reference resolved through the registry
    Named(QName),
    /// Anonymous type owned by the declaration
    Inline(SchemaType),
}

impl TypeRef {
    /// Reference a registered type by name
    pub fn named(name: QName) -> Self {
        Self::Named(name)
    }

    /// Inline simple type
    pub fn simple(simple_type: Arc<dyn SimpleType>) -> Self {
        Self::Inline(SchemaType::Simple(simple_type))
    }

    /// Inline complex type
    pub fn complex(complex_type: ComplexType) -> Self {
        Self::Inline(SchemaType::Complex(Arc::new(complex_type)))
    }
}

/// The schema component registry
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    elements: IndexMap<QName, Arc<ElementDecl>>,
    types: IndexMap<QName, SchemaType>,
    constraints: IndexMap<QName, IdentityConstraint>,
    substitution: HashMap<QName, Vec<Arc<ElementDecl>>>,
    pending: Vec<SchemaDefinitionError>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global element declaration.
    ///
    /// A duplicate name is recorded as a definition error and the first
    /// registration wins.
    pub fn register_element(&mut self, decl: ElementDecl) {
        if self.elements.contains_key(&decl.name) {
            self.pending.push(
                SchemaDefinitionError::new("duplicate global element declaration")
                    .with_component(decl.name.to_string()),
            );
            return;
        }
        self.elements.insert(decl.name.clone(), Arc::new(decl));
    }

    /// Register a named type
    pub fn register_type(&mut self, name: QName, schema_type: SchemaType) {
        if self.types.contains_key(&name) {
            self.pending.push(
                SchemaDefinitionError::new("duplicate global type definition")
                    .with_component(name.to_string()),
            );
            return;
        }
        self.types.insert(name, schema_type);
    }

    /// Register a simple type under its own name
    pub fn register_simple_type(&mut self, simple_type: Arc<dyn SimpleType>) {
        let name = simple_type.name().clone();
        self.register_type(name, SchemaType::Simple(simple_type));
    }

    /// Register a complex type under its declared name
    pub fn register_complex_type(&mut self, complex_type: ComplexType) {
        match complex_type.name.clone() {
            Some(name) => self.register_type(name, SchemaType::Complex(Arc::new(complex_type))),
            None => self.pending.push(SchemaDefinitionError::new(
                "anonymous complex types cannot be registered globally",
            )),
        }
    }

    /// Look up an element declaration: exact name first, then the
    /// local-name match an unqualified declaration admits
    pub fn lookup_element(&self, name: &QName) -> Option<Arc<ElementDecl>> {
        self.elements.get(name).cloned().or_else(|| {
            self.elements
                .values()
                .find(|decl| decl.matches_name(name))
                .cloned()
        })
    }

    /// Look up a type by name
    pub fn lookup_type(&self, name: &QName) -> Option<SchemaType> {
        self.types.get(name).cloned()
    }

    /// Look up an identity constraint by name (populated by `build()`)
    pub fn lookup_constraint(&self, name: &QName) -> Option<&IdentityConstraint> {
        self.constraints.get(name)
    }

    /// Substitution-group members of a head element
    pub fn substitution_members(&self, head: &QName) -> &[Arc<ElementDecl>] {
        self.substitution
            .get(head)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve a type reference into a concrete type
    pub fn resolve_type(&self, type_ref: &TypeRef) -> Result<SchemaType> {
        match type_ref {
            TypeRef::Inline(schema_type) => Ok(schema_type.clone()),
            TypeRef::Named(name) => self.lookup_type(name).ok_or_else(|| {
                SchemaDefinitionError::new("reference to unknown type")
                    .with_component(name.to_string())
                    .into()
            }),
        }
    }

    /// Run every compile-time check and build the substitution-group index.
    ///
    /// Errors are collected per component; the registry keeps checking the
    /// remaining components after each failure and reports all of them.
    pub fn build(&mut self) -> std::result::Result<(), Vec<SchemaDefinitionError>> {
        let mut errors = std::mem::take(&mut self.pending);

        for decl in self.elements.values() {
            if let Err(Error::Schema(e)) = decl.check_definition() {
                errors.push(e);
            }
        }

        self.collect_constraints(&mut errors);
        self.check_keyrefs(&mut errors);
        self.check_all_groups(&mut errors);
        self.check_derivations(&mut errors);
        self.build_substitution_index(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn collect_constraints(&mut self, errors: &mut Vec<SchemaDefinitionError>) {
        let mut constraints = IndexMap::new();
        for decl in self.elements.values() {
            for constraint in &decl.constraints {
                if constraints.contains_key(&constraint.name) {
                    errors.push(
                        SchemaDefinitionError::new("duplicate identity constraint name")
                            .with_component(constraint.name.to_string()),
                    );
                    continue;
                }
                constraints.insert(constraint.name.clone(), constraint.clone());
            }
        }
        self.constraints = constraints;
    }

    fn check_keyrefs(&self, errors: &mut Vec<SchemaDefinitionError>) {
        for constraint in self.constraints.values() {
            if constraint.kind != IdentityKind::Keyref {
                continue;
            }
            let Some(refer) = constraint.refer.as_ref() else {
                errors.push(
                    SchemaDefinitionError::new("keyref is missing its referenced constraint")
                        .with_component(constraint.name.to_string()),
                );
                continue;
            };
            match self.constraints.get(refer) {
                None => errors.push(
                    SchemaDefinitionError::new(format!(
                        "keyref refers to unknown constraint '{}'",
                        refer
                    ))
                    .with_component(constraint.name.to_string()),
                ),
                Some(target) if target.kind == IdentityKind::Keyref => errors.push(
                    SchemaDefinitionError::new(format!(
                        "keyref cannot refer to another keyref '{}'",
                        refer
                    ))
                    .with_component(constraint.name.to_string()),
                ),
                Some(_) => {}
            }
        }
    }

    fn check_all_groups(&self, errors: &mut Vec<SchemaDefinitionError>) {
        fn walk(group: &ModelGroup, component: &str, errors: &mut Vec<SchemaDefinitionError>) {
            for particle in &group.particles {
                match particle {
                    GroupParticle::Group(nested) => {
                        if group.model == ModelType::All {
                            errors.push(
                                SchemaDefinitionError::new(
                                    "'all' groups admit element particles only",
                                )
                                .with_component(component.to_string()),
                            );
                        }
                        walk(nested, component, errors);
                    }
                    GroupParticle::Element(ep) => {
                        if let Some(ref decl) = ep.decl {
                            if let TypeRef::Inline(SchemaType::Complex(ct)) = &decl.type_ref {
                                if let Some(nested) = ct.content.group() {
                                    walk(nested, component, errors);
                                }
                            }
                        }
                    }
                }
            }
        }

        for (name, schema_type) in &self.types {
            if let SchemaType::Complex(ct) = schema_type {
                if let Some(group) = ct.content.group() {
                    walk(group, &name.to_string(), errors);
                }
            }
        }
        for decl in self.elements.values() {
            if let TypeRef::Inline(SchemaType::Complex(ct)) = &decl.type_ref {
                if let Some(group) = ct.content.group() {
                    walk(group, &decl.name.to_string(), errors);
                }
            }
        }
    }

    fn check_derivations(&self, errors: &mut Vec<SchemaDefinitionError>) {
        for schema_type in self.types.values() {
            if let SchemaType::Complex(ct) = schema_type {
                if let Err(Error::Schema(e)) = ct.check_derivation(self) {
                    errors.push(e);
                }
            }
        }
    }

    fn type_name(&self, type_ref: &TypeRef) -> Option<QName> {
        match type_ref {
            TypeRef::Named(name) => Some(name.clone()),
            TypeRef::Inline(schema_type) => schema_type.name(),
        }
    }

    /// Check one substitution member against its head: the member's type
    /// must equal the head's type, or derive from it through steps none of
    /// which the head's final restriction blocks.
    fn check_substitution(
        &self,
        member: &ElementDecl,
        head: &ElementDecl,
    ) -> std::result::Result<(), SchemaDefinitionError> {
        let head_type = self.type_name(&head.type_ref);
        let member_type = self.type_name(&member.type_ref);
        if head_type.is_some() && head_type == member_type {
            return Ok(());
        }

        let Some(head_type) = head_type else {
            return Err(SchemaDefinitionError::new(
                "substitution head has an anonymous type",
            )
            .with_component(head.name.to_string()));
        };

        let resolved = self.resolve_type(&member.type_ref).map_err(|_| {
            SchemaDefinitionError::new("substitution member has an unresolvable type")
                .with_component(member.name.to_string())
        })?;
        let SchemaType::Complex(mut current) = resolved else {
            return Err(SchemaDefinitionError::new(format!(
                "type of substitution member is not derived from '{}'",
                head_type
            ))
            .with_component(member.name.to_string()));
        };
        if !current.is_derived_from(&head_type, self) {
            return Err(SchemaDefinitionError::new(format!(
                "type of substitution member is not derived from '{}'",
                head_type
            ))
            .with_component(member.name.to_string()));
        }

        // derived; walk the chain once more so every step's method is
        // checked against the head's final restriction
        for _ in 0..MAX_CHAIN_DEPTH {
            let (Some(base), Some(method)) = (current.base_type.clone(), current.derivation)
            else {
                break;
            };
            if head.final_flags.is_blocked(method) {
                return Err(SchemaDefinitionError::new(format!(
                    "substitution by {} derivation is blocked by the head's final restriction",
                    method.as_str()
                ))
                .with_component(member.name.to_string()));
            }
            if base == head_type {
                break;
            }
            match self.lookup_type(&base) {
                Some(SchemaType::Complex(next)) => current = next,
                _ => break,
            }
        }
        Ok(())
    }

    fn build_substitution_index(&mut self, errors: &mut Vec<SchemaDefinitionError>) {
        let mut index: HashMap<QName, Vec<Arc<ElementDecl>>> = HashMap::new();
        for decl in self.elements.values() {
            let Some(head_name) = decl.substitution_group.as_ref() else {
                continue;
            };
            let Some(head) = self.elements.get(head_name) else {
                errors.push(
                    SchemaDefinitionError::new(format!(
                        "substitution group head '{}' is not declared",
                        head_name
                    ))
                    .with_component(decl.name.to_string()),
                );
                continue;
            };
            match self.check_substitution(decl, head) {
                Ok(()) => index
                    .entry(head_name.clone())
                    .or_default()
                    .push(Arc::clone(decl)),
                Err(e) => errors.push(e),
            }
        }

        // close transitively: a member of a member substitutes the outer head
        loop {
            let mut additions: Vec<(QName, Arc<ElementDecl>)> = Vec::new();
            for (head, members) in &index {
                for member in members {
                    for nested in index.get(&member.name).into_iter().flatten() {
                        let present = index[head].iter().any(|m| m.name == nested.name);
                        if !present {
                            additions.push((head.clone(), Arc::clone(nested)));
                        }
                    }
                }
            }
            if additions.is_empty() {
                break;
            }
            for (head, member) in additions {
                index.entry(head).or_default().push(member);
            }
        }

        self.substitution = index;
    }

    /// Decode a node against its global declaration.
    ///
    /// Strict mode returns the first error as `Err`; lax mode returns the
    /// best-effort value with the collected errors; skip mode decodes
    /// structurally.
    pub fn decode(
        &self,
        node: &XmlNode,
        mode: ValidationMode,
    ) -> Result<(DecodedValue, Vec<ValidationError>)> {
        let decl = self.lookup_element(&node.tag).ok_or_else(|| {
            Error::Validation(ValidationError::new(
                ValidationErrorKind::TagExpected,
                format!("no declaration found for element '{}'", node.tag),
            ))
        })?;
        let mut ctx = ValidationContext::new(mode);
        let value = decl.decode(node, self, &mut ctx)?;
        Ok((value, ctx.into_errors()))
    }

    /// Encode a decoded value against its global declaration
    pub fn encode(
        &self,
        value: &DecodedValue,
        mode: ValidationMode,
    ) -> Result<(XmlNode, Vec<ValidationError>)> {
        let decl = self.lookup_element(&value.tag).ok_or_else(|| {
            Error::Validation(ValidationError::new(
                ValidationErrorKind::TagExpected,
                format!("no declaration found for element '{}'", value.tag),
            ))
        })?;
        let mut ctx = ValidationContext::new(mode);
        let node = decl.encode(value, self, &mut ctx)?;
        Ok((node, ctx.into_errors()))
    }

    /// Validate a node, collecting every error
    pub fn validate(&self, node: &XmlNode) -> Result<ValidationOutcome> {
        let decl = self.lookup_element(&node.tag).ok_or_else(|| {
            Error::Validation(ValidationError::new(
                ValidationErrorKind::TagExpected,
                format!("no declaration found for element '{}'", node.tag),
            ))
        })?;
        decl.validate(node, self)
    }

    /// True when the node validates without errors
    pub fn is_valid(&self, node: &XmlNode) -> bool {
        self.validate(node)
            .map(|outcome| outcome.is_valid())
            .unwrap_or(false)
    }

    /// All validation errors for a node, in visiting order
    pub fn iter_errors(&self, node: &XmlNode) -> Vec<ValidationError> {
        self.validate(node)
            .map(|outcome| outcome.errors)
            .unwrap_or_default()
    }
}
