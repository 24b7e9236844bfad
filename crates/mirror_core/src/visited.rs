use std::collections::HashSet;

use crate::model::PageId;

/// Page ids exported during one traversal run.
///
/// Owned by whoever drives the run and handed to every traversal step, so
/// independent runs never share state.
#[derive(Debug, Default, Clone)]
pub struct VisitedSet {
    ids: HashSet<PageId>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &PageId) -> bool {
        self.ids.contains(id)
    }

    /// Returns `false` if the id had already been recorded.
    pub fn mark(&mut self, id: PageId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
