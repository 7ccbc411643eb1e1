//! Domain models for comment threads.
//!
//! This module contains the comment records, the reply [`Forest`] built from
//! them, and the values derived from a forest.

/// Comment records and identifiers.
pub mod comment;
pub use comment::{Comment, CommentId, Identity, InvalidIdentity, NewComment, PostId, UserId};

/// Reply forest reconstruction and traversal.
pub mod forest;
pub use forest::{CommentNode, CommentTree, Forest, Walk};

mod collapse;
pub use collapse::CollapsedSet;

mod config;
pub use config::{Config, IdentityConfig};

mod snapshot;
pub use snapshot::{fingerprint, Snapshot};

mod stats;
pub use stats::{ForestStats, ThreadSummary};
