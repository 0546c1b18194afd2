use std::fmt::{Display, Formatter};

/// A handle to a node stored in a [`Graph`][crate::graph::Graph].
///
/// Handles are plain indices into the graph arena, so they are cheap to copy and compare.
/// Two handles are equal iff they denote the *same* node: structurally identical nodes
/// constructed separately always receive distinct handles.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ref(u32);

impl Ref {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the index of the referenced node in the arena.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}
