use borsh::BorshSerialize;
use sha2::{Digest, Sha256};

use crate::domain::{comment::Comment, forest::Forest};

/// A flat collection of comments as returned by one fetch, together with its
/// fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    comments: Vec<Comment>,
    fingerprint: String,
}

impl Snapshot {
    /// Captures a fetched collection.
    #[must_use]
    pub fn new(comments: Vec<Comment>) -> Self {
        let fingerprint = fingerprint(&comments);
        Self {
            comments,
            fingerprint,
        }
    }

    /// The SHA256 fingerprint of the collection.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Builds the reply forest for this snapshot.
    #[must_use]
    pub fn forest(&self) -> Forest {
        Forest::build(&self.comments)
    }
}

/// Calculate the fingerprint of a flat comment collection.
///
/// The fingerprint is a SHA256 hash of the Borsh-serialized records, in order.
/// Two fetches with the same fingerprint produce the same forest.
///
/// # Panics
///
/// Panics if borsh serialization fails (which should never happen for this
/// data structure).
#[must_use]
pub fn fingerprint(comments: &[Comment]) -> String {
    #[derive(BorshSerialize)]
    struct Record<'a> {
        id: u64,
        post_id: u64,
        parent: Option<u64>,
        content: &'a str,
        user_id: &'a str,
        author: &'a str,
        created_micros: i64,
    }

    let records: Vec<Record<'_>> = comments
        .iter()
        .map(|comment| Record {
            id: comment.id.get(),
            post_id: comment.post_id.get(),
            parent: comment.parent_comment_id.map(|parent| parent.get()),
            content: &comment.content,
            user_id: comment.user_id.as_str(),
            author: &comment.author,
            created_micros: comment.created_at.timestamp_micros(),
        })
        .collect();

    // encode using [borsh](https://borsh.io/)
    let encoded = borsh::to_vec(&records).expect("this should never fail");

    let hash = Sha256::digest(encoded);
    format!("{hash:x}")
}
