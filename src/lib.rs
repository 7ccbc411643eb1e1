//! Comment thread reconstruction
//!
//! Comments are stored as flat records, each optionally replying to another
//! comment. This crate rebuilds the reply structure as a [`Forest`] and
//! provides a plain-text store of discussions.

pub mod domain;
pub use domain::{
    Comment, CommentId, CommentNode, CommentTree, Config, Forest, ForestStats, Identity, PostId,
    Snapshot,
};

/// Comment stores and auth providers.
pub mod storage;
pub use storage::{AuthProvider, CommentStore, Directory, MemoryStore};

/// Fetching, refreshing, and submitting comments for one post.
pub mod discussion;
pub use discussion::{fetch_forest, Discussion, RefreshOutcome, SubmitError};
