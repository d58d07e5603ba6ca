//! Explicit result type for a plugin call.
//!
//! Replaces exception-driven control flow:
//! a plugin call never lets an exception cross into the run loop; instead
//! the executor converts whatever happened into one of these variants and
//! the arbiter / run loop branch on it.

/// Outcome of a single `Plugin::display` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// The plugin drew a frame successfully.
    Rendered,
    /// The plugin had nothing to show right now (not an error; try the next
    /// mode on a non-dynamic slice, or keep polling on a dynamic one).
    NoContent,
    /// The call raised, timed out, or otherwise failed.
    Failed(String),
}

impl DisplayOutcome {
    /// Whether this outcome should count as a failure for health tracking.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
