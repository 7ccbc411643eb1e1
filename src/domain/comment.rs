use std::{fmt, num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw backend identifier.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// The raw integer value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().trim_start_matches('#').parse().map(Self)
            }
        }
    };
}

integer_id!(
    /// Unique identifier of a comment, assigned by the store on creation.
    CommentId
);

integer_id!(
    /// Identifier of the post a comment belongs to.
    PostId
);

/// Opaque identifier of the user who wrote a comment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a user identifier as supplied by the auth provider.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single message attached to a post, optionally replying to another
/// comment.
///
/// Comments are flat records. The reply structure is reconstructed by
/// [`Forest::build`](crate::Forest::build).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier.
    pub id: CommentId,
    /// The post this comment belongs to.
    pub post_id: PostId,
    /// The comment this one replies to, if any.
    pub parent_comment_id: Option<CommentId>,
    /// Body text.
    pub content: String,
    /// The posting user.
    pub user_id: UserId,
    /// Display name of the posting user.
    pub author: String,
    /// When the comment was created.
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Whether this comment declares a parent.
    ///
    /// A reply whose parent cannot be found is still a reply by this
    /// definition, even though it ends up as a root in the forest.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

/// The fields supplied when submitting a comment or reply.
///
/// The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Target post.
    pub post_id: PostId,
    /// Body text.
    pub content: String,
    /// The comment being replied to.
    pub parent_comment_id: Option<CommentId>,
    /// The posting user.
    pub user_id: UserId,
    /// Display name of the posting user.
    pub author: String,
}

impl NewComment {
    /// Completes the record with the identifier and timestamp assigned by a
    /// store.
    #[must_use]
    pub fn into_comment(self, id: CommentId, created_at: DateTime<Utc>) -> Comment {
        Comment {
            id,
            post_id: self.post_id,
            parent_comment_id: self.parent_comment_id,
            content: self.content,
            user_id: self.user_id,
            author: self.author,
            created_at,
        }
    }
}

/// The authenticated user on whose behalf comments are submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: UserId,
    author: NonEmptyString,
}

/// Error returned when an identity has an empty user id or display name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidIdentity {
    /// The user identifier was empty.
    #[error("user id must not be empty")]
    EmptyUserId,
    /// The display name was empty.
    #[error("author name must not be empty")]
    EmptyAuthor,
}

impl Identity {
    /// Creates an identity from a user id and display name.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidIdentity`] if either value is blank.
    pub fn new(
        user_id: impl Into<String>,
        author: impl Into<String>,
    ) -> Result<Self, InvalidIdentity> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(InvalidIdentity::EmptyUserId);
        }

        let author = author.into();
        if author.trim().is_empty() {
            return Err(InvalidIdentity::EmptyAuthor);
        }
        let author = NonEmptyString::new(author).map_err(|_| InvalidIdentity::EmptyAuthor)?;

        Ok(Self {
            user_id: UserId(user_id),
            author,
        })
    }

    /// The user's identifier.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The user's display name.
    #[must_use]
    pub fn author(&self) -> &str {
        self.author.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_with_optional_hash() {
        assert_eq!("42".parse::<CommentId>().unwrap(), CommentId::new(42));
        assert_eq!("#7".parse::<CommentId>().unwrap(), CommentId::new(7));
        assert!("abc".parse::<PostId>().is_err());
    }

    #[test]
    fn identity_rejects_blank_fields() {
        assert_eq!(
            Identity::new("", "alice").unwrap_err(),
            InvalidIdentity::EmptyUserId
        );
        assert_eq!(
            Identity::new("u-1", "   ").unwrap_err(),
            InvalidIdentity::EmptyAuthor
        );

        let identity = Identity::new("u-1", "alice").unwrap();
        assert_eq!(identity.user_id().as_str(), "u-1");
        assert_eq!(identity.author(), "alice");
    }

    #[test]
    fn new_comment_keeps_parent_when_completed() {
        let created = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let comment = NewComment {
            post_id: PostId::new(3),
            content: "hello".to_string(),
            parent_comment_id: Some(CommentId::new(1)),
            user_id: UserId::new("u-1"),
            author: "alice".to_string(),
        }
        .into_comment(CommentId::new(2), created);

        assert_eq!(comment.id, CommentId::new(2));
        assert_eq!(comment.parent_comment_id, Some(CommentId::new(1)));
        assert_eq!(comment.created_at, created);
        assert!(comment.is_reply());
    }
}
