//! Comment stores and auth providers.
//!
//! The reply forest is built from whatever a [`CommentStore`] returns. Two
//! stores are provided: an in-memory [`MemoryStore`] and a filesystem backed
//! [`Directory`].

use std::{fmt, io, path::PathBuf};

use nonempty::NonEmpty;

use crate::domain::{Comment, CommentId, Identity, NewComment, PostId};

mod auth;
pub use auth::{EnvAuth, StaticAuth, AUTHOR_VAR, USER_ID_VAR};

pub mod directory;
pub use directory::Directory;

/// Markdown serialization for comments.
pub mod markdown;
pub use markdown::{LoadError, MarkdownComment};

mod memory;
pub use memory::MemoryStore;

mod path_parser;
pub use path_parser::{
    construct_comment_path, parse_comment_path, post_dir, ParseError, META_DIR,
};

/// A source of flat comment collections.
pub trait CommentStore {
    /// Every post known to the store, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn posts(&self) -> Result<Vec<PostId>, FetchError>;

    /// All comments on `post`, ordered by creation time (oldest first), ties
    /// broken by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn comments_for_post(&self, post: PostId) -> Result<Vec<Comment>, FetchError>;

    /// Stores a new comment or reply, assigning its id and creation time.
    ///
    /// # Errors
    ///
    /// Returns [`InsertError::ParentNotFound`] if the comment replies to a
    /// comment that is not part of the same post, or another [`InsertError`]
    /// if the store cannot be read or written.
    fn insert(&mut self, comment: NewComment) -> Result<Comment, InsertError>;
}

/// Supplies the user comments are attributed to.
pub trait AuthProvider {
    /// The authenticated user, or `None` if nobody is signed in.
    fn current_user(&self) -> Option<Identity>;
}

/// Errors that can occur when fetching comments.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The store could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Files that are not valid comments were found and the configuration
    /// does not allow them.
    #[error("Unrecognised files: {}", PathList(.0))]
    UnrecognisedFiles(NonEmpty<PathBuf>),
}

struct PathList<'a>(&'a NonEmpty<PathBuf>);

impl fmt::Display for PathList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", path.display())?;
        }
        Ok(())
    }
}

/// Errors that can occur when storing a comment.
#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    /// The comment replies to a comment that does not exist on the post.
    #[error("comment {parent} not found on post {post}")]
    ParentNotFound {
        /// The target post.
        post: PostId,
        /// The missing parent.
        parent: CommentId,
    },

    /// The existing comments could not be read.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Every comment id is taken.
    #[error("no comment ids left")]
    IdsExhausted,

    /// The comment could not be written.
    #[error("failed to write {}", path.display())]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}
