//! Content model groups (sequence, choice, all)
//!
//! Matching follows a cursor contract: a group consumes items from a slice
//! starting at an index and returns the next unconsumed index. The same
//! matcher drives decoding (items are XML nodes) and encoding (items are
//! decoded child pairs); the caller supplies a consume callback invoked once
//! per matched item with the resolved element declaration.

use crate::decoded::DecodedValue;
use crate::error::{Result, ValidationError, ValidationErrorKind};
use crate::namespaces::QName;
use crate::nodes::XmlNode;
use crate::validators::elements::ElementDecl;
use crate::validators::particles::{Occurs, Particle};
use crate::validators::registry::SchemaRegistry;
use crate::validators::validation::ValidationContext;
use std::sync::Arc;

/// The three content model kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// Particles matched strictly in order
    Sequence,
    /// Exactly one alternative per occurrence
    Choice,
    /// Each particle at most once, any order
    All,
}

/// An item a content model can match: anything exposing a tag
pub trait Tagged {
    /// The qualified tag of this item
    fn tag(&self) -> &QName;
}

impl Tagged for XmlNode {
    fn tag(&self) -> &QName {
        &self.tag
    }
}

impl Tagged for (QName, DecodedValue) {
    fn tag(&self) -> &QName {
        &self.0
    }
}

/// Callback invoked for each matched item with its resolved declaration
pub type ConsumeFn<'a, T> =
    dyn FnMut(&T, &Arc<ElementDecl>, &mut ValidationContext) -> Result<()> + 'a;

/// An element particle: a declaration reference with occurrence bounds
#[derive(Debug, Clone)]
pub struct ElementParticle {
    /// Qualified name of the declared element
    pub name: QName,
    /// Occurrence bounds of this particle
    pub occurs: Occurs,
    /// Inline local declaration; None for references to global declarations
    pub decl: Option<Arc<ElementDecl>>,
}

impl ElementParticle {
    /// Particle referencing a global element declaration by name
    pub fn reference(name: QName, occurs: Occurs) -> Self {
        Self {
            name,
            occurs,
            decl: None,
        }
    }

    /// Particle carrying an inline local declaration; occurrence bounds
    /// come from the declaration itself
    pub fn local(decl: Arc<ElementDecl>) -> Self {
        Self {
            name: decl.name.clone(),
            occurs: decl.occurs,
            decl: Some(decl),
        }
    }

    /// Resolve the declaration matching `tag`, directly or through the
    /// substitution group of a referenced global declaration.
    pub fn resolve(&self, tag: &QName, registry: &SchemaRegistry) -> Option<Arc<ElementDecl>> {
        if let Some(ref decl) = self.decl {
            if !decl.is_abstract && decl.matches_name(tag) {
                return Some(Arc::clone(decl));
            }
            return None;
        }
        let head = registry.lookup_element(&self.name)?;
        if !head.is_abstract && head.matches_name(tag) {
            return Some(head);
        }
        registry
            .substitution_members(&self.name)
            .iter()
            .find(|member| member.matches_name(tag))
            .cloned()
    }

    /// Tags this particle would accept, head first then substitutes
    pub fn expected_tags(&self, registry: &SchemaRegistry) -> Vec<String> {
        let mut tags = vec![self.name.to_string()];
        if self.decl.is_none() {
            for member in registry.substitution_members(&self.name) {
                tags.push(member.name.to_string());
            }
        }
        tags
    }
}

impl Particle for ElementParticle {
    fn occurs(&self) -> &Occurs {
        &self.occurs
    }
}

/// A particle of a content model group
#[derive(Debug, Clone)]
pub enum GroupParticle {
    /// An element declaration reference
    Element(ElementParticle),
    /// A nested group
    Group(Arc<ModelGroup>),
}

impl GroupParticle {
    fn matches_start(&self, tag: &QName, registry: &SchemaRegistry) -> bool {
        match self {
            Self::Element(ep) => ep.resolve(tag, registry).is_some(),
            Self::Group(group) => group.first_match(tag, registry),
        }
    }

    fn collect_expected(&self, registry: &SchemaRegistry, tags: &mut Vec<String>) {
        match self {
            Self::Element(ep) => tags.extend(ep.expected_tags(registry)),
            Self::Group(group) => tags.extend(group.expected_tags(registry)),
        }
    }
}

impl Particle for GroupParticle {
    fn occurs(&self) -> &Occurs {
        match self {
            Self::Element(ep) => &ep.occurs,
            Self::Group(group) => &group.occurs,
        }
    }

    fn is_emptiable(&self) -> bool {
        match self {
            Self::Element(ep) => ep.occurs.min == 0,
            Self::Group(group) => group.is_emptiable(),
        }
    }
}

/// A content model group with its own occurrence bounds
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// Kind of this group
    pub model: ModelType,
    /// Occurrence bounds of the group itself
    pub occurs: Occurs,
    /// Particles in declared order
    pub particles: Vec<GroupParticle>,
}

impl ModelGroup {
    /// Create a sequence group occurring exactly once
    pub fn sequence(particles: Vec<GroupParticle>) -> Self {
        Self {
            model: ModelType::Sequence,
            occurs: Occurs::once(),
            particles,
        }
    }

    /// Create a choice group occurring exactly once
    pub fn choice(particles: Vec<GroupParticle>) -> Self {
        Self {
            model: ModelType::Choice,
            occurs: Occurs::once(),
            particles,
        }
    }

    /// Create an all group occurring exactly once
    pub fn all(particles: Vec<GroupParticle>) -> Self {
        Self {
            model: ModelType::All,
            occurs: Occurs::once(),
            particles,
        }
    }

    /// Override the group's occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// True when the group accepts empty input
    pub fn is_emptiable(&self) -> bool {
        self.occurs.min == 0 || self.body_emptiable()
    }

    fn body_emptiable(&self) -> bool {
        match self.model {
            ModelType::Sequence | ModelType::All => {
                self.particles.iter().all(Particle::is_emptiable)
            }
            ModelType::Choice => self.particles.iter().any(Particle::is_emptiable),
        }
    }

    /// True when this group could start by consuming an item tagged `tag`
    pub fn first_match(&self, tag: &QName, registry: &SchemaRegistry) -> bool {
        match self.model {
            ModelType::Sequence => {
                for particle in &self.particles {
                    if particle.matches_start(tag, registry) {
                        return true;
                    }
                    if !particle.is_emptiable() {
                        return false;
                    }
                }
                false
            }
            ModelType::Choice | ModelType::All => self
                .particles
                .iter()
                .any(|p| p.matches_start(tag, registry)),
        }
    }

    /// Tags admissible at the start of this group
    pub fn expected_tags(&self, registry: &SchemaRegistry) -> Vec<String> {
        let mut tags = Vec::new();
        match self.model {
            ModelType::Sequence => {
                for particle in &self.particles {
                    particle.collect_expected(registry, &mut tags);
                    if !particle.is_emptiable() {
                        break;
                    }
                }
            }
            ModelType::Choice | ModelType::All => {
                for particle in &self.particles {
                    particle.collect_expected(registry, &mut tags);
                }
            }
        }
        tags
    }

    /// Match items against this group, honoring the group's own occurrence
    /// bounds, and return the next unconsumed index.
    ///
    /// Floor violations go through the context's mode policy, so lax mode
    /// keeps matching after recording them.
    pub fn match_items<T: Tagged>(
        &self,
        items: &[T],
        start: usize,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        consume: &mut ConsumeFn<'_, T>,
    ) -> Result<usize> {
        let mut index = start;
        let mut count = 0;
        while index < items.len() && !self.occurs.is_over(count) {
            if !self.first_match(items[index].tag(), registry) {
                break;
            }
            let next = self.match_once(items, index, registry, ctx, consume)?;
            if next == index {
                break;
            }
            index = next;
            count += 1;
        }

        if self.occurs.is_missing(count) {
            match self.model {
                ModelType::Choice => {
                    ctx.raise_or_collect(
                        ValidationError::new(
                            ValidationErrorKind::NoMatchingAlternative,
                            "no alternative of the choice group matched",
                        )
                        .with_expected_tags(self.expected_tags(registry)),
                    )?;
                }
                // run one more pass so each unmet particle reports itself
                ModelType::Sequence | ModelType::All => {
                    index = self.match_once(items, index, registry, ctx, consume)?;
                }
            }
        }

        Ok(index)
    }

    /// Match one occurrence of the group body
    fn match_once<T: Tagged>(
        &self,
        items: &[T],
        start: usize,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        consume: &mut ConsumeFn<'_, T>,
    ) -> Result<usize> {
        match self.model {
            ModelType::Sequence => self.match_sequence(items, start, registry, ctx, consume),
            ModelType::Choice => self.match_choice(items, start, registry, ctx, consume),
            ModelType::All => self.match_all(items, start, registry, ctx, consume),
        }
    }

    fn match_element_particle<T: Tagged>(
        ep: &ElementParticle,
        items: &[T],
        start: usize,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        consume: &mut ConsumeFn<'_, T>,
    ) -> Result<usize> {
        let mut index = start;
        let mut count = 0;
        while index < items.len() && !ep.occurs.is_over(count) {
            match ep.resolve(items[index].tag(), registry) {
                Some(decl) => {
                    consume(&items[index], &decl, ctx)?;
                    index += 1;
                    count += 1;
                }
                None => break,
            }
        }
        if ep.occurs.is_missing(count) {
            ctx.raise_or_collect(
                ValidationError::new(
                    ValidationErrorKind::TagExpected,
                    format!("missing required element '{}'", ep.name),
                )
                .with_expected_tags(ep.expected_tags(registry)),
            )?;
        }
        Ok(index)
    }

    fn match_sequence<T: Tagged>(
        &self,
        items: &[T],
        start: usize,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        consume: &mut ConsumeFn<'_, T>,
    ) -> Result<usize> {
        let mut index = start;
        for particle in &self.particles {
            match particle {
                GroupParticle::Element(ep) => {
                    index = Self::match_element_particle(ep, items, index, registry, ctx, consume)?;
                }
                GroupParticle::Group(group) => {
                    index = group.match_items(items, index, registry, ctx, consume)?;
                }
            }
        }
        Ok(index)
    }

    fn match_choice<T: Tagged>(
        &self,
        items: &[T],
        start: usize,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        consume: &mut ConsumeFn<'_, T>,
    ) -> Result<usize> {
        if start >= items.len() {
            return Ok(start);
        }
        let tag = items[start].tag().clone();
        for particle in &self.particles {
            if !particle.matches_start(&tag, registry) {
                continue;
            }
            return match particle {
                GroupParticle::Element(ep) => {
                    Self::match_element_particle(ep, items, start, registry, ctx, consume)
                }
                GroupParticle::Group(group) => {
                    group.match_items(items, start, registry, ctx, consume)
                }
            };
        }
        Ok(start)
    }

    fn match_all<T: Tagged>(
        &self,
        items: &[T],
        start: usize,
        registry: &SchemaRegistry,
        ctx: &mut ValidationContext,
        consume: &mut ConsumeFn<'_, T>,
    ) -> Result<usize> {
        let mut matched = vec![false; self.particles.len()];
        let mut index = start;
        'items: while index < items.len() {
            for (i, particle) in self.particles.iter().enumerate() {
                if matched[i] {
                    continue;
                }
                // build() guarantees all-group particles are elements
                let GroupParticle::Element(ep) = particle else {
                    continue;
                };
                if let Some(decl) = ep.resolve(items[index].tag(), registry) {
                    consume(&items[index], &decl, ctx)?;
                    matched[i] = true;
                    index += 1;
                    continue 'items;
                }
            }
            break;
        }

        for (i, particle) in self.particles.iter().enumerate() {
            if matched[i] || particle.is_emptiable() {
                continue;
            }
            if let GroupParticle::Element(ep) = particle {
                ctx.raise_or_collect(
                    ValidationError::new(
                        ValidationErrorKind::TagExpected,
                        format!("missing required element '{}'", ep.name),
                    )
                    .with_expected_tags(ep.expected_tags(registry)),
                )?;
            }
        }
        Ok(index)
    }
}

impl Particle for ModelGroup {
    fn occurs(&self) -> &Occurs {
        &self.occurs
    }

    fn is_emptiable(&self) -> bool {
        ModelGroup::is_emptiable(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::base::ValidationMode;

    fn particle(name: &str, occurs: Occurs) -> GroupParticle {
        GroupParticle::Element(ElementParticle::reference(QName::local(name), occurs))
    }

    #[test]
    fn test_emptiable_sequence() {
        let group = ModelGroup::sequence(vec![
            particle("a", Occurs::optional()),
            particle("b", Occurs::zero_or_more()),
        ]);
        assert!(group.is_emptiable());

        let group = ModelGroup::sequence(vec![
            particle("a", Occurs::optional()),
            particle("b", Occurs::once()),
        ]);
        assert!(!group.is_emptiable());
        assert!(group.with_occurs(Occurs::optional()).is_emptiable());
    }

    #[test]
    fn test_emptiable_choice() {
        let group = ModelGroup::choice(vec![
            particle("a", Occurs::once()),
            particle("b", Occurs::optional()),
        ]);
        assert!(group.is_emptiable());

        let group = ModelGroup::choice(vec![
            particle("a", Occurs::once()),
            particle("b", Occurs::once()),
        ]);
        assert!(!group.is_emptiable());
    }

    #[test]
    fn test_expected_tags_sequence_prefix() {
        let registry = SchemaRegistry::new();
        let group = ModelGroup::sequence(vec![
            particle("a", Occurs::optional()),
            particle("b", Occurs::once()),
            particle("c", Occurs::once()),
        ]);
        assert_eq!(group.expected_tags(&registry), vec!["a", "b"]);
    }

    #[test]
    fn test_expected_tags_choice() {
        let registry = SchemaRegistry::new();
        let group = ModelGroup::choice(vec![
            particle("a", Occurs::once()),
            particle("b", Occurs::once()),
        ]);
        assert_eq!(group.expected_tags(&registry), vec!["a", "b"]);
    }

    #[test]
    fn test_choice_no_alternative() {
        let registry = SchemaRegistry::new();
        let group = ModelGroup::choice(vec![
            particle("a", Occurs::once()),
            particle("b", Occurs::once()),
        ]);

        let items: Vec<XmlNode> = vec![];
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        let next = group
            .match_items(&items, 0, &registry, &mut ctx, &mut |_, _, _| Ok(()))
            .unwrap();

        assert_eq!(next, 0);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(
            ctx.errors()[0].kind,
            ValidationErrorKind::NoMatchingAlternative
        );
    }
}
