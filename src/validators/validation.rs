//! Per-invocation validation context
//!
//! Compiled components are immutable; everything mutable during a traversal
//! (mode, accumulated errors, recursion depth, identity tuple tables) lives
//! here, so any number of threads can decode or encode against one registry
//! concurrently.

use crate::error::{Error, Result, ValidationError, ValidationErrorKind};
use crate::limits::Limits;
use crate::namespaces::QName;
use crate::validators::base::{DecodeState, ValidationMode};
use crate::validators::identities::FieldTuple;
use std::collections::{HashMap, HashSet};

/// Mutable state of one decode/encode invocation
#[derive(Debug)]
pub struct ValidationContext {
    /// Strictness policy for this invocation
    pub mode: ValidationMode,
    /// Whether absent values fall back to declared defaults
    pub use_defaults: bool,
    errors: Vec<ValidationError>,
    level: usize,
    limits: Limits,
    state: DecodeState,
    identities: HashMap<QName, HashSet<FieldTuple>>,
}

impl ValidationContext {
    /// Create a context for the given mode with default limits
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            use_defaults: mode.is_validating(),
            errors: Vec::new(),
            level: 0,
            limits: Limits::default(),
            state: DecodeState::NotStarted,
            identities: HashMap::new(),
        }
    }

    /// Create a context with explicit resource limits
    pub fn with_limits(mode: ValidationMode, limits: Limits) -> Self {
        Self {
            limits,
            ..Self::new(mode)
        }
    }

    /// Raise in strict mode, collect in lax mode, drop in skip mode
    pub fn raise_or_collect(&mut self, error: ValidationError) -> Result<()> {
        match self.mode {
            ValidationMode::Strict => {
                self.state = DecodeState::Failed;
                Err(Error::Validation(error))
            }
            ValidationMode::Lax => {
                self.errors.push(error);
                Ok(())
            }
            ValidationMode::Skip => Ok(()),
        }
    }

    /// Enter one recursion level; the depth guard is fatal in every mode
    pub fn enter_level(&mut self) -> Result<()> {
        self.level += 1;
        if self.level > self.limits.max_depth {
            let error = ValidationError::new(
                ValidationErrorKind::DepthExceeded,
                format!("traversal depth exceeds {}", self.limits.max_depth),
            );
            self.state = DecodeState::Failed;
            return Err(Error::Validation(error));
        }
        Ok(())
    }

    /// Leave one recursion level
    pub fn leave_level(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Current recursion level
    pub fn level(&self) -> usize {
        self.level
    }

    /// Record phase progress for the element currently under validation
    pub fn set_state(&mut self, state: DecodeState) {
        self.state = state;
    }

    /// Phase of the most recent element traversal
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Errors collected so far
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Consume the context, yielding the collected errors
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Record a key/unique tuple for keyref resolution.
    ///
    /// Uniqueness is not judged here: the table spans every scope visited by
    /// this invocation, while duplicates are only meaningful within one
    /// declaring instance.
    pub fn record_identity(&mut self, constraint: &QName, tuple: FieldTuple) {
        self.identities
            .entry(constraint.clone())
            .or_default()
            .insert(tuple);
    }

    /// Check whether a referenced constraint produced the given tuple
    pub fn has_identity(&self, constraint: &QName, tuple: &FieldTuple) -> bool {
        self.identities
            .get(constraint)
            .map(|tuples| tuples.contains(tuple))
            .unwrap_or(false)
    }
}

/// Summary verdict of a validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Every error produced, in visiting order
    pub errors: Vec<ValidationError>,
}

impl ValidationOutcome {
    /// Create an outcome from collected errors
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// True when no errors were produced
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::identities::FieldValue;

    #[test]
    fn test_strict_raises() {
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        let err = ValidationError::new(ValidationErrorKind::MissingAttribute, "test");
        assert!(ctx.raise_or_collect(err).is_err());
        assert_eq!(ctx.state(), DecodeState::Failed);
    }

    #[test]
    fn test_lax_collects() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        let err = ValidationError::new(ValidationErrorKind::MissingAttribute, "test");
        assert!(ctx.raise_or_collect(err).is_ok());
        assert_eq!(ctx.errors().len(), 1);
    }

    #[test]
    fn test_skip_drops() {
        let mut ctx = ValidationContext::new(ValidationMode::Skip);
        let err = ValidationError::new(ValidationErrorKind::MissingAttribute, "test");
        assert!(ctx.raise_or_collect(err).is_ok());
        assert!(ctx.errors().is_empty());
        assert!(!ctx.use_defaults);
    }

    #[test]
    fn test_depth_guard_fatal_in_lax() {
        let mut ctx =
            ValidationContext::with_limits(ValidationMode::Lax, Limits { max_depth: 2, max_attributes: 10 });
        assert!(ctx.enter_level().is_ok());
        assert!(ctx.enter_level().is_ok());
        assert!(ctx.enter_level().is_err());
    }

    #[test]
    fn test_leave_level() {
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        ctx.enter_level().unwrap();
        assert_eq!(ctx.level(), 1);
        ctx.leave_level();
        assert_eq!(ctx.level(), 0);
    }

    #[test]
    fn test_identity_tables() {
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        let name = QName::local("itemKey");
        let tuple = vec![FieldValue::String("x".to_string())];

        ctx.record_identity(&name, tuple.clone());
        ctx.record_identity(&name, tuple.clone());
        assert!(ctx.has_identity(&name, &tuple));
        assert!(!ctx.has_identity(&QName::local("other"), &tuple));
    }

    #[test]
    fn test_outcome() {
        assert!(ValidationOutcome::default().is_valid());
        let outcome = ValidationOutcome::new(vec![ValidationError::new(
            ValidationErrorKind::TagExpected,
            "missing",
        )]);
        assert!(!outcome.is_valid());
    }
}
