//! Type-safe wrappers for graph parameters.
//!
//! A parameter is a slot in the graph's parameter table. Nodes refer to the slot by its
//! [`ParamId`] and never hold the value itself, so rebinding a parameter is visible to every
//! node built on top of it.
use std::fmt;

/// A parameter identifier (0-indexed position in the parameter table).
///
/// # Invariants
///
/// - Ids are assigned densely in creation order by [`Graph::mk_parameter`][crate::graph::Graph::mk_parameter].
/// - Every id is owned by exactly one `Parameter` node.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ParamId(u32);

impl ParamId {
    /// Creates a new parameter id.
    pub fn new(id: u32) -> Self {
        ParamId(id)
    }

    /// Returns the position of the parameter in the parameter table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}
