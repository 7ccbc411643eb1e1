use std::collections::BTreeSet;

use crate::domain::{comment::CommentId, forest::Forest};

/// The set of comments whose replies are hidden.
///
/// Forests are rebuilt from scratch on every change, so display state is
/// keyed by comment id rather than attached to nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapsedSet(BTreeSet<CommentId>);

impl CollapsedSet {
    /// Whether replies to `id` are hidden.
    #[must_use]
    pub fn contains(&self, id: CommentId) -> bool {
        self.0.contains(&id)
    }

    /// Hides the replies to `id`.
    ///
    /// Returns `true` if the comment was not already collapsed.
    pub fn collapse(&mut self, id: CommentId) -> bool {
        self.0.insert(id)
    }

    /// Shows the replies to `id` again.
    ///
    /// Returns `true` if the comment was collapsed.
    pub fn expand(&mut self, id: CommentId) -> bool {
        self.0.remove(&id)
    }

    /// Flips the state of `id`, returning `true` if it is now collapsed.
    pub fn toggle(&mut self, id: CommentId) -> bool {
        if self.expand(id) {
            false
        } else {
            self.collapse(id)
        }
    }

    /// Drops ids that no longer exist in `forest`.
    pub fn retain_present(&mut self, forest: &Forest) {
        self.0.retain(|&id| forest.get(id).is_some());
    }

    /// The number of collapsed comments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is collapsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CommentId> for CollapsedSet {
    fn from_iter<T: IntoIterator<Item = CommentId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
