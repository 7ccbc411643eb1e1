use serde::Serialize;

use crate::domain::{comment::CommentId, forest::Forest};

/// Counts derived from a [`Forest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForestStats {
    /// All comments, roots and replies alike.
    pub total_comments: usize,
    /// Top-level comments.
    pub root_comments: usize,
    /// Replies whose parent was not found.
    pub orphans: usize,
    /// Comments promoted to roots to break a reply cycle.
    pub cycle_promotions: usize,
    /// Deepest reply level, with roots at zero.
    pub max_depth: usize,
    /// One entry per thread, in root order.
    pub threads: Vec<ThreadSummary>,
}

/// Size of one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    /// The thread's top-level comment.
    pub root: CommentId,
    /// Direct replies to the root.
    pub replies: usize,
    /// Every comment in the thread, including the root.
    pub size: usize,
}

impl From<&Forest> for ForestStats {
    fn from(forest: &Forest) -> Self {
        let mut threads: Vec<ThreadSummary> = Vec::with_capacity(forest.root_comments());
        let mut max_depth = 0;

        for (depth, node) in forest.walk() {
            if depth == 0 {
                threads.push(ThreadSummary {
                    root: node.id(),
                    replies: node.reply_count(),
                    size: 0,
                });
            }
            max_depth = max_depth.max(depth);
            // The walk finishes each thread before starting the next.
            if let Some(thread) = threads.last_mut() {
                thread.size += 1;
            }
        }

        Self {
            total_comments: forest.total_comments(),
            root_comments: forest.root_comments(),
            orphans: forest.orphans().len(),
            cycle_promotions: forest.cycle_promotions().len(),
            max_depth,
            threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::domain::comment::{Comment, PostId, UserId};

    fn comment(id: u64, parent: Option<u64>) -> Comment {
        Comment {
            id: CommentId::new(id),
            post_id: PostId::new(1),
            parent_comment_id: parent.map(CommentId::new),
            content: String::new(),
            user_id: UserId::new("u"),
            author: "a".to_string(),
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
        }
    }

    #[test]
    fn counts_threads_and_depth() {
        let forest = Forest::build(&[
            comment(1, None),
            comment(2, Some(1)),
            comment(3, Some(1)),
            comment(4, Some(2)),
            comment(5, Some(404)),
            comment(6, Some(6)),
        ]);

        let stats = ForestStats::from(&forest);

        assert_eq!(stats.total_comments, 6);
        assert_eq!(stats.root_comments, 3);
        assert_eq!(stats.orphans, 1);
        assert_eq!(stats.cycle_promotions, 1);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(
            stats.threads,
            vec![
                ThreadSummary {
                    root: CommentId::new(1),
                    replies: 2,
                    size: 4,
                },
                ThreadSummary {
                    root: CommentId::new(5),
                    replies: 0,
                    size: 1,
                },
                ThreadSummary {
                    root: CommentId::new(6),
                    replies: 0,
                    size: 1,
                },
            ]
        );
    }

    #[test]
    fn empty_forest_has_zero_counts() {
        assert_eq!(ForestStats::from(&Forest::default()), ForestStats::default());
    }
}
