use serde::Serialize;
use std::collections::BTreeSet;

/// Result of a transitive query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Closure<T: Ord> {
    /// Everything reached, seeds included for path-shaped queries.
    pub items: BTreeSet<T>,

    /// Number of worklist nodes whose references were read.
    pub expanded: usize,

    /// The run stopped early on cancellation; `items` holds what was found until then.
    pub cancelled: bool,
}

impl<T: Ord> Closure<T> {
    pub fn new() -> Self {
        Self {
            items: BTreeSet::new(),
            expanded: 0,
            cancelled: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

impl<T: Ord> Default for Closure<T> {
    fn default() -> Self {
        Self::new()
    }
}
