//! Base definitions shared by all schema components

use std::fmt;

/// Validation strictness policy threaded through every traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    /// Stop at the first error in visiting order
    #[default]
    Strict,
    /// Collect every error and still return a best-effort result
    Lax,
    /// Structural traversal only, no semantic checks
    Skip,
}

impl ValidationMode {
    /// Check if this is strict mode
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Check if this mode performs semantic checks
    pub fn is_validating(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::Skip => "skip",
        };
        write!(f, "{}", s)
    }
}

/// Progress of a single element decode/encode pass.
///
/// The phases run in a fixed order and no state is revisited. A strict-mode
/// failure transitions to `Failed` from whichever phase raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeState {
    /// Nothing validated yet
    #[default]
    NotStarted,
    /// Attribute uses checked
    AttributesValidated,
    /// Content model matched
    ContentValidated,
    /// Identity constraints evaluated
    ConstraintsEvaluated,
    /// Traversal complete
    Done,
    /// Aborted on a strict-mode error
    Failed,
}
