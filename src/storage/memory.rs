use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use super::{CommentStore, FetchError, InsertError};
use crate::domain::{Comment, CommentId, NewComment, PostId};

/// An in-memory comment store.
///
/// Ids are unique across all posts. Creation times never go backwards, so
/// comments inserted in sequence keep their insertion order when fetched.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    posts: BTreeMap<PostId, Vec<Comment>>,
    last_id: u64,
    last_created: Option<DateTime<Utc>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fully-formed comment without any validation.
    ///
    /// Useful for seeding a store with data from elsewhere, including
    /// dangling or cyclic parent references.
    pub fn push(&mut self, comment: Comment) {
        self.last_id = self.last_id.max(comment.id.get());
        self.last_created = Some(
            self.last_created
                .map_or(comment.created_at, |last| last.max(comment.created_at)),
        );
        self.posts.entry(comment.post_id).or_default().push(comment);
    }

    fn next_created(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_created {
            Some(last) if last >= now => last + TimeDelta::microseconds(1),
            _ => now,
        }
    }
}

impl FromIterator<Comment> for MemoryStore {
    fn from_iter<T: IntoIterator<Item = Comment>>(iter: T) -> Self {
        let mut store = Self::new();
        for comment in iter {
            store.push(comment);
        }
        store
    }
}

impl CommentStore for MemoryStore {
    fn posts(&self) -> Result<Vec<PostId>, FetchError> {
        Ok(self.posts.keys().copied().collect())
    }

    fn comments_for_post(&self, post: PostId) -> Result<Vec<Comment>, FetchError> {
        let mut comments = self.posts.get(&post).cloned().unwrap_or_default();
        comments.sort_by_key(|comment| (comment.created_at, comment.id));
        Ok(comments)
    }

    fn insert(&mut self, comment: NewComment) -> Result<Comment, InsertError> {
        if let Some(parent) = comment.parent_comment_id {
            let found = self
                .posts
                .get(&comment.post_id)
                .is_some_and(|comments| comments.iter().any(|c| c.id == parent));
            if !found {
                return Err(InsertError::ParentNotFound {
                    post: comment.post_id,
                    parent,
                });
            }
        }

        let id = self
            .last_id
            .checked_add(1)
            .map(CommentId::new)
            .ok_or(InsertError::IdsExhausted)?;
        let comment = comment.into_comment(id, self.next_created());
        self.push(comment.clone());

        tracing::debug!(%id, post = %comment.post_id, "stored comment");
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn new_comment(post: u64, parent: Option<u64>, content: &str) -> NewComment {
        NewComment {
            post_id: PostId::new(post),
            content: content.to_string(),
            parent_comment_id: parent.map(CommentId::new),
            user_id: UserId::new("u-1"),
            author: "alice".to_string(),
        }
    }

    #[test]
    fn insert_assigns_increasing_ids_across_posts() {
        let mut store = MemoryStore::new();

        let first = store.insert(new_comment(1, None, "a")).unwrap();
        let second = store.insert(new_comment(2, None, "b")).unwrap();
        let reply = store.insert(new_comment(1, Some(1), "c")).unwrap();

        assert_eq!(first.id, CommentId::new(1));
        assert_eq!(second.id, CommentId::new(2));
        assert_eq!(reply.id, CommentId::new(3));
        assert!(reply.created_at > first.created_at);
        assert_eq!(store.posts().unwrap(), vec![PostId::new(1), PostId::new(2)]);
    }

    #[test]
    fn reply_to_comment_on_other_post_is_rejected() {
        let mut store = MemoryStore::new();
        store.insert(new_comment(1, None, "a")).unwrap();

        let error = store.insert(new_comment(2, Some(1), "b")).unwrap_err();
        assert!(matches!(
            error,
            InsertError::ParentNotFound { post, parent }
                if post == PostId::new(2) && parent == CommentId::new(1)
        ));
    }

    #[test]
    fn comments_are_returned_oldest_first() {
        let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let seeded = |id: u64, offset: i64| Comment {
            id: CommentId::new(id),
            post_id: PostId::new(1),
            parent_comment_id: None,
            content: String::new(),
            user_id: UserId::new("u"),
            author: "a".to_string(),
            created_at: base + TimeDelta::seconds(offset),
        };
        let store: MemoryStore = [seeded(3, 5), seeded(1, 10), seeded(2, 5)].into_iter().collect();

        let ids: Vec<u64> = store
            .comments_for_post(PostId::new(1))
            .unwrap()
            .iter()
            .map(|comment| comment.id.get())
            .collect();

        assert_eq!(ids, vec![2, 3, 1]);
        assert!(store.comments_for_post(PostId::new(9)).unwrap().is_empty());
    }

    #[test]
    fn insert_fails_when_ids_run_out() {
        let mut store: MemoryStore = [Comment {
            id: CommentId::new(u64::MAX),
            post_id: PostId::new(1),
            parent_comment_id: None,
            content: String::new(),
            user_id: UserId::new("u"),
            author: "a".to_string(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }]
        .into_iter()
        .collect();

        let error = store.insert(new_comment(1, None, "late")).unwrap_err();
        assert!(matches!(error, InsertError::IdsExhausted));
        assert_eq!(store.comments_for_post(PostId::new(1)).unwrap().len(), 1);
    }
}
