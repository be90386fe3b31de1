//! Limits for instance traversal
//!
//! This module defines resource guards used while decoding and encoding.
//! Self-referential content models that consume no input are a schema
//! authoring defect the engine cannot detect up front, so traversal carries
//! a recursion depth cap to fail fast instead of overflowing the stack.

use crate::error::{Error, Result};

/// Default maximum element nesting depth for decode/encode traversal
pub const MAX_TRAVERSAL_DEPTH: usize = 512;

/// Default maximum number of attributes per element
pub const MAX_ATTRIBUTES: usize = 1024;

/// Limits configuration for a traversal
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_depth: usize,
    /// Maximum number of attributes per element
    pub max_attributes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: MAX_TRAVERSAL_DEPTH,
            max_attributes: MAX_ATTRIBUTES,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_depth: 64,
            max_attributes: 128,
        }
    }

    /// Check an attribute count against the limit
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        if count > self.max_attributes {
            return Err(Error::LimitExceeded(format!(
                "element carries {} attributes, maximum is {}",
                count, self.max_attributes
            )));
        }
        Ok(())
    }
}
