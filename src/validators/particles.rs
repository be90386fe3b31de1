//! Occurrence bounds shared by every content-bearing component

use std::fmt;

/// minOccurs/maxOccurs bounds of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences
    pub min: usize,
    /// Maximum number of occurrences (None = unbounded)
    pub max: Option<usize>,
}

impl Occurs {
    /// Exactly one occurrence (the default for particles)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Zero or one occurrence
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more occurrences
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more occurrences
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Explicit bounds (max = None for unbounded)
    pub fn bounded(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// True when this particle is exactly-once
    pub fn is_once(&self) -> bool {
        self.min == 1 && self.max == Some(1)
    }

    /// True when `count` occurrences do not yet reach the floor
    pub fn is_missing(&self, count: usize) -> bool {
        count < self.min
    }

    /// True when `count` occurrences already reached the ceiling
    pub fn is_over(&self, count: usize) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }

    /// True when these bounds fit within `other` (restriction compatibility)
    pub fn has_occurs_restriction(&self, other: &Occurs) -> bool {
        if self.min < other.min {
            return false;
        }
        match (self.max, other.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a <= b,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl fmt::Display for Occurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, unbounded]", self.min),
        }
    }
}

/// A content-model component carrying occurrence bounds
pub trait Particle {
    /// The occurrence bounds of this particle
    fn occurs(&self) -> &Occurs;

    /// True when this particle accepts empty input
    fn is_emptiable(&self) -> bool {
        self.occurs().min == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(Occurs::once(), Occurs { min: 1, max: Some(1) });
        assert_eq!(Occurs::optional(), Occurs { min: 0, max: Some(1) });
        assert_eq!(Occurs::zero_or_more(), Occurs { min: 0, max: None });
        assert!(Occurs::once().is_once());
        assert!(!Occurs::one_or_more().is_once());
    }

    #[test]
    fn test_floor_and_ceiling() {
        let occurs = Occurs::bounded(1, Some(3));
        assert!(occurs.is_missing(0));
        assert!(!occurs.is_missing(1));
        assert!(!occurs.is_over(2));
        assert!(occurs.is_over(3));

        let unbounded = Occurs::zero_or_more();
        assert!(!unbounded.is_over(1_000_000));
    }

    #[test]
    fn test_occurs_restriction() {
        let base = Occurs::bounded(0, None);
        assert!(Occurs::once().has_occurs_restriction(&base));
        assert!(Occurs::bounded(2, Some(5)).has_occurs_restriction(&base));

        let narrow = Occurs::bounded(1, Some(2));
        assert!(!Occurs::optional().has_occurs_restriction(&narrow));
        assert!(!Occurs::bounded(1, Some(3)).has_occurs_restriction(&narrow));
        assert!(!Occurs::one_or_more().has_occurs_restriction(&narrow));
    }

    #[test]
    fn test_display() {
        assert_eq!(Occurs::once().to_string(), "[1, 1]");
        assert_eq!(Occurs::zero_or_more().to_string(), "[0, unbounded]");
    }
}
