//! Element declarations
//!
//! The element declaration is the central component: it owns a type
//! reference, the nillable/abstract flags, default or fixed value, the
//! substitution-group head, and the identity constraints scoped to its
//! subtree. Decoding and encoding both run here, re-entered recursively by
//! content model groups for each matched child.

use crate::decoded::{DecodedValue, XsdValue};
use crate::error::{
    Result, SchemaDefinitionError, ValidationError, ValidationErrorKind,
};
use crate::namespaces::QName;
use crate::nodes::{XmlNode, NIL_ATTRIBUTE};
use crate::validators::base::DecodeState;
use crate::validators::builtins::collapse_whitespace;
use crate::validators::complex_types::{ComplexType, ContentKind, DerivationFlags};
use crate::validators::identities::{IdentityConstraint, IdentityKind};
use crate::validators::particles::Occurs;
use crate::validators::registry::{SchemaRegistry, SchemaType, TypeRef};
use crate::validators::simple_types::SimpleType;
use crate::validators::validation::{ValidationContext, ValidationOutcome};
use std::sync::Arc;

/// Where an element declaration appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementScope {
    /// Top-level declaration, registered by name
    #[default]
    Global,
    /// Declaration nested inside a content model
    Local,
}

/// A compiled element declaration
#[derive(Debug)]
pub struct ElementDecl {
    /// Qualified name
    pub name: QName,
    /// Reference to the element's type
    pub type_ref: TypeRef,
    /// Global or local scope
    pub scope: ElementScope,
    /// Whether instance tags must be namespace-qualified to match
    pub qualified: bool,
    /// Whether the element admits an explicit nil marker
    pub nillable: bool,
    /// Abstract declarations match only through substitution
    pub is_abstract: bool,
    /// Occurrence bounds, meaningful for local declarations only
    pub occurs: Occurs,
    /// Head of the substitution group this element belongs to
    pub substitution_group: Option<QName>,
    /// Default value applied when content is absent
    pub default: Option<String>,
    /// Fixed value the content must equal when present
    pub fixed: Option<String>,
    /// Derivations of this element's type forbidden for substitutes
    pub final_flags: DerivationFlags,
    /// Identity constraints in declaration order
    pub constraints: Vec<IdentityConstraint>,
}

impl ElementDecl {
    /// Create a global element declaration
    pub fn new(name: QName, type_ref: TypeRef) -> Self {
        Self {
            name,
            type_ref,
            scope: ElementScope::Global,
            qualified: false,
            nillable: false,
            is_abstract: false,
            occurs: Occurs::once(),
            substitution_group: None,
            default: None,
            fixed: None,
            final_flags: DerivationFlags::none(),
            constraints: Vec::new(),
        }
    }

    /// Mark the declaration as locally scoped
    pub fn local_scope(mut self) -> Self {
        self.scope = ElementScope::Local;
        self
    }

    /// Require namespace-qualified instance tags
    pub fn qualified(mut self) -> Self {
        self.qualified = true;
        self
    }

    /// Admit the nil marker attribute
    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    /// Mark the declaration abstract
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Set occurrence bounds (local declarations only, checked at build)
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Join a substitution group headed by `head`
    pub fn with_substitution_group(mut self, head: QName) -> Self {
        self.substitution_group = Some(head);
        self
    }

    /// Set a default value; conflicts with a fixed value
    pub fn with_default(mut self, value: impl Into<String>) -> Result<Self> {
        if self.fixed.is_some() {
            return Err(SchemaDefinitionError::new(
                "'default' and 'fixed' attributes are mutually exclusive",
            )
            .with_component(self.name.to_string())
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
            .with_component(self.name.to_string())
            .into());
        }
        self.fixed = Some(value.into());
        Ok(self)
    }

    /// Forbid type derivations for substitution members
    pub fn with_final(mut self, flags: DerivationFlags) -> Self {
        self.final_flags = flags;
        self
    }

    /// Attach an identity constraint
    pub fn with_constraint(mut self, constraint: IdentityConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Exact qname match, or local-name match when unqualified
    pub fn matches_name(&self, tag: &QName) -> bool {
        if self.name == *tag {
            return true;
        }
        !self.qualified && self.name.local_name == tag.local_name
    }

    /// Compile-time checks that do not need the registry
    pub fn check_definition(&self) -> Result<()> {
        if self.scope == ElementScope::Global && !self.occurs.is_once() {
            return Err(SchemaDefinitionError::new(
                "global element declarations carry no occurrence bounds",
            )
            .with_component(self.name.to_string())
            .into());
        }
        Ok(())
    }

    /// Decode an instance node into a typed value.
    ///
    /// Error production order is fixed: attributes, then content, then
    /// identity constraints. Strict mode stops at the first error, lax mode
    /// collects and returns a best-effort value, skip mode decodes
    /// structurally with no semantic checks.
    pub fn decode(
        &self,
        node: &XmlNode,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
    ) -> Result<DecodedValue> {
        ctx.enter_level()?;
        let result = self.decode_inner(node, registry, ctx);
        ctx.leave_level();
        result
    }

    fn decode_inner(
        &self,
        node: &XmlNode,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
    ) -> Result<DecodedValue> {
        ctx.set_state(DecodeState::NotStarted);
        if !ctx.mode.is_validating() {
            let value = DecodedValue::from_node_unchecked(node);
            ctx.set_state(DecodeState::Done);
            return Ok(value);
        }

        if self.is_abstract {
            ctx.raise_or_collect(
                ValidationError::new(
                    ValidationErrorKind::UnexpectedChild,
                    format!("abstract element '{}' cannot appear in an instance", self.name),
                )
                .with_element(node.tag.to_string()),
            )?;
        }

        let mut attributes = node.attributes.clone();
        let nil = attributes.shift_remove(NIL_ATTRIBUTE);
        let is_nil = matches!(nil.as_deref(), Some("true") | Some("1"));
        if nil.is_some() && !self.nillable {
            ctx.raise_or_collect(
                ValidationError::new(
                    ValidationErrorKind::UnexpectedAttribute,
                    format!("element '{}' is not nillable", self.name),
                )
                .with_element(node.tag.to_string()),
            )?;
        }
        if is_nil && self.nillable {
            if !node.children.is_empty() || node.trimmed_text().is_some() {
                ctx.raise_or_collect(
                    ValidationError::new(
                        ValidationErrorKind::UnexpectedChild,
                        "a nilled element must carry no content",
                    )
                    .with_element(node.tag.to_string()),
                )?;
            }
            ctx.set_state(DecodeState::Done);
            return Ok(DecodedValue::with_text(node.tag.clone(), XsdValue::Null));
        }

        let schema_type = registry.resolve_type(&self.type_ref)?;
        let mut decoded = DecodedValue::new(node.tag.clone());

        match schema_type {
            SchemaType::Simple(simple) => {
                for name in attributes.keys() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedAttribute,
                            format!("simple type element admits no attribute '{}'", name),
                        )
                        .with_element(node.tag.to_string()),
                    )?;
                }
                ctx.set_state(DecodeState::AttributesValidated);

                if !node.children.is_empty() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!("simple type element '{}' admits no children", self.name),
                        )
                        .with_element(node.tag.to_string()),
                    )?;
                }
                decoded.text = self.decode_simple_text(node.trimmed_text(), &simple, ctx)?;
                ctx.set_state(DecodeState::ContentValidated);
            }
            SchemaType::Complex(complex) => {
                decoded.attributes = complex.attributes.decode(&attributes, ctx)?;
                ctx.set_state(DecodeState::AttributesValidated);
                self.decode_content(node, &complex, registry, ctx, &mut decoded)?;
                ctx.set_state(DecodeState::ContentValidated);
            }
        }

        self.evaluate_constraints(node, ctx)?;
        ctx.set_state(DecodeState::Done);
        Ok(decoded)
    }

    fn decode_content(
        &self,
        node: &XmlNode,
        complex: &ComplexType,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        decoded: &mut DecodedValue,
    ) -> Result<()> {
        match &complex.content {
            ContentKind::Empty => {
                if !node.children.is_empty() || node.trimmed_text().is_some() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!("element '{}' must be empty", self.name),
                        )
                        .with_element(node.tag.to_string()),
                    )?;
                }
            }
            ContentKind::Simple(simple) => {
                if !node.children.is_empty() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!("simple content element '{}' admits no children", self.name),
                        )
                        .with_element(node.tag.to_string()),
                    )?;
                }
                decoded.text = self.decode_simple_text(node.trimmed_text(), simple, ctx)?;
            }
            ContentKind::ElementOnly(group) => {
                if node.trimmed_text().is_some() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!(
                                "character data is not allowed inside element '{}'",
                                self.name
                            ),
                        )
                        .with_element(node.tag.to_string()),
                    )?;
                }
                decoded.content = Some(self.decode_children(node, group, registry, ctx)?);
            }
            ContentKind::Mixed(group) => {
                if let Some(text) = node.trimmed_text() {
                    decoded.text = Some(XsdValue::String(text.to_string()));
                }
                decoded.content = Some(self.decode_children(node, group, registry, ctx)?);
            }
        }
        Ok(())
    }

    fn decode_children(
        &self,
        node: &XmlNode,
        group: &crate::validators::groups::ModelGroup,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
    ) -> Result<Vec<(QName, DecodedValue)>> {
        let mut content = Vec::new();
        let next = group.match_items(
            &node.children,
            0,
            registry,
            ctx,
            &mut |child: &XmlNode, decl: &Arc<ElementDecl>, ctx: &mut ValidationContext| {
                let value = decl.decode(child, registry, ctx)?;
                content.push((child.tag.clone(), value));
                Ok(())
            },
        )?;
        for leftover in &node.children[next..] {
            ctx.raise_or_collect(
                ValidationError::new(
                    ValidationErrorKind::UnexpectedChild,
                    format!("unexpected child element '{}'", leftover.tag),
                )
                .with_element(node.tag.to_string()),
            )?;
        }
        Ok(content)
    }

    fn decode_simple_text(
        &self,
        text: Option<&str>,
        simple: &Arc<dyn SimpleType>,
        ctx: &mut ValidationContext,
    ) -> Result<Option<XsdValue>> {
        let effective = match text {
            Some(t) => {
                if let Some(ref fixed) = self.fixed {
                    if collapse_whitespace(t) != *fixed {
                        ctx.raise_or_collect(
                            ValidationError::new(
                                ValidationErrorKind::SimpleContentTypeError,
                                format!(
                                    "element '{}' must have the fixed value '{}'",
                                    self.name, fixed
                                ),
                            )
                            .with_element(self.name.to_string()),
                        )?;
                        return Ok(None);
                    }
                }
                Some(t.to_string())
            }
            None if ctx.use_defaults => self.fixed.clone().or_else(|| self.default.clone()),
            None => None,
        };
        match effective {
            Some(lexical) => match simple.decode(&lexical) {
                Ok(value) => Ok(Some(value)),
                Err(error) => {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::SimpleContentTypeError,
                            format!("invalid content for element '{}'", self.name),
                        )
                        .with_reason(error.to_string())
                        .with_element(self.name.to_string()),
                    )?;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Evaluate identity constraints: key/unique before keyref, so keyrefs
    /// can resolve tuples recorded in the same pass.
    fn evaluate_constraints(&self, node: &XmlNode, ctx: &mut ValidationContext) -> Result<()> {
        for constraint in &self.constraints {
            if constraint.kind != IdentityKind::Keyref {
                constraint.evaluate(node, ctx)?;
            }
        }
        for constraint in &self.constraints {
            if constraint.kind == IdentityKind::Keyref {
                constraint.evaluate(node, ctx)?;
            }
        }
        if !self.constraints.is_empty() {
            ctx.set_state(DecodeState::ConstraintsEvaluated);
        }
        Ok(())
    }

    /// Encode a decoded value back into an instance node, the structural
    /// inverse of [`decode`](Self::decode) under the same mode semantics.
    pub fn encode(
        &self,
        value: &DecodedValue,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
    ) -> Result<XmlNode> {
        ctx.enter_level()?;
        let result = self.encode_inner(value, registry, ctx);
        ctx.leave_level();
        result
    }

    fn encode_inner(
        &self,
        value: &DecodedValue,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
    ) -> Result<XmlNode> {
        if !ctx.mode.is_validating() {
            return Ok(value.to_node_unchecked());
        }

        if self.is_abstract {
            ctx.raise_or_collect(
                ValidationError::new(
                    ValidationErrorKind::UnexpectedChild,
                    format!("abstract element '{}' cannot be encoded", self.name),
                )
                .with_element(value.tag.to_string()),
            )?;
        }

        if matches!(value.text, Some(XsdValue::Null)) {
            if self.nillable {
                let node =
                    XmlNode::new(value.tag.clone()).with_attribute(NIL_ATTRIBUTE, "true");
                return Ok(node);
            }
            ctx.raise_or_collect(
                ValidationError::new(
                    ValidationErrorKind::SimpleContentTypeError,
                    format!("element '{}' is not nillable", self.name),
                )
                .with_element(value.tag.to_string()),
            )?;
        }

        let schema_type = registry.resolve_type(&self.type_ref)?;
        let mut node = XmlNode::new(value.tag.clone());

        match schema_type {
            SchemaType::Simple(simple) => {
                for name in value.attributes.keys() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedAttribute,
                            format!("simple type element admits no attribute '{}'", name),
                        )
                        .with_element(value.tag.to_string()),
                    )?;
                }
                if value.content.as_ref().is_some_and(|c| !c.is_empty()) {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!("simple type element '{}' admits no children", self.name),
                        )
                        .with_element(value.tag.to_string()),
                    )?;
                }
                node.text = self.encode_simple_text(value.text.as_ref(), &simple, ctx)?;
            }
            SchemaType::Complex(complex) => {
                node.attributes = complex.attributes.encode(&value.attributes, ctx)?;
                self.encode_content(value, &complex, registry, ctx, &mut node)?;
            }
        }

        self.evaluate_constraints(&node, ctx)?;
        Ok(node)
    }

    fn encode_content(
        &self,
        value: &DecodedValue,
        complex: &ComplexType,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        node: &mut XmlNode,
    ) -> Result<()> {
        match &complex.content {
            ContentKind::Empty => {
                let has_content = value.content.as_ref().is_some_and(|c| !c.is_empty());
                if has_content || value.text.is_some() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!("element '{}' must be empty", self.name),
                        )
                        .with_element(value.tag.to_string()),
                    )?;
                }
            }
            ContentKind::Simple(simple) => {
                if value.content.as_ref().is_some_and(|c| !c.is_empty()) {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!("simple content element '{}' admits no children", self.name),
                        )
                        .with_element(value.tag.to_string()),
                    )?;
                }
                node.text = self.encode_simple_text(value.text.as_ref(), simple, ctx)?;
            }
            ContentKind::ElementOnly(group) => {
                if value.text.is_some() {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::UnexpectedChild,
                            format!(
                                "character data is not allowed inside element '{}'",
                                self.name
                            ),
                        )
                        .with_element(value.tag.to_string()),
                    )?;
                }
                self.encode_children(value, group, registry, ctx, node)?;
            }
            ContentKind::Mixed(group) => {
                if let Some(ref text) = value.text {
                    if !text.is_null() {
                        node.text = Some(text.to_lexical());
                    }
                }
                self.encode_children(value, group, registry, ctx, node)?;
            }
        }
        Ok(())
    }

    fn encode_children(
        &self,
        value: &DecodedValue,
        group: &crate::validators::groups::ModelGroup,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        node: &mut XmlNode,
    ) -> Result<()> {
        let empty = Vec::new();
        let items = value.content.as_ref().unwrap_or(&empty);
        let mut children = Vec::new();
        let next = group.match_items(
            items,
            0,
            registry,
            ctx,
            &mut |item: &(QName, DecodedValue),
                  decl: &Arc<ElementDecl>,
                  ctx: &mut ValidationContext| {
                let child = decl.encode(&item.1, registry, ctx)?;
                children.push(child);
                Ok(())
            },
        )?;
        for (tag, _) in &items[next..] {
            ctx.raise_or_collect(
                ValidationError::new(
                    ValidationErrorKind::UnexpectedChild,
                    format!("unexpected child element '{}'", tag),
                )
                .with_element(value.tag.to_string()),
            )?;
        }
        node.children = children;
        Ok(())
    }

    fn encode_simple_text(
        &self,
        text: Option<&XsdValue>,
        simple: &Arc<dyn SimpleType>,
        ctx: &mut ValidationContext,
    ) -> Result<Option<String>> {
        match text {
            Some(XsdValue::Null) | None => {
                if ctx.use_defaults {
                    Ok(self.fixed.clone().or_else(|| self.default.clone()))
                } else {
                    Ok(None)
                }
            }
            Some(value) => match simple.encode(value) {
                Ok(lexical) => {
                    if let Some(ref fixed) = self.fixed {
                        if &lexical != fixed {
                            ctx.raise_or_collect(
                                ValidationError::new(
                                    ValidationErrorKind::SimpleContentTypeError,
                                    format!(
                                        "element '{}' must have the fixed value '{}'",
                                        self.name, fixed
                                    ),
                                )
                                .with_element(self.name.to_string()),
                            )?;
                            return Ok(None);
                        }
                    }
                    Ok(Some(lexical))
                }
                Err(error) => {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::SimpleContentTypeError,
                            format!("cannot encode content of element '{}'", self.name),
                        )
                        .with_reason(error.to_string())
                        .with_element(self.name.to_string()),
                    )?;
                    Ok(None)
                }
            },
        }
    }

    /// Validate a node, collecting every error, and return the verdict
    pub fn validate(&self, node: &XmlNode, registry: &SchemaRegistry) -> Result<ValidationOutcome> {
        let mut ctx = ValidationContext::new(crate::validators::base::ValidationMode::Lax);
        match self.decode(node, registry, &mut ctx) {
            Ok(_) => Ok(ValidationOutcome::new(ctx.into_errors())),
            Err(crate::error::Error::Validation(error)) => {
                let mut errors = ctx.into_errors();
                errors.push(error);
                Ok(ValidationOutcome::new(errors))
            }
            Err(other) => Err(other),
        }
    }
}
