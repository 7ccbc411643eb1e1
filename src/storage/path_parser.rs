//! Path conventions for the discussion directory
//!
//! Each post is a directory named after its id, and each comment is a
//! markdown file named after its id inside that directory:
//!
//! - `root/12/40.md` → post `12`, comment `40`
//! - `root/.threads/` holds configuration and is never treated as a post

use std::{
    num::ParseIntError,
    path::{Component, Path, PathBuf},
};

use crate::domain::{CommentId, PostId};

/// Name of the directory that holds configuration.
pub const META_DIR: &str = ".threads";

/// Parse the post and comment ids from a comment file path.
///
/// # Errors
///
/// Returns an error if:
/// - The path is not inside `root`, or is not valid UTF-8
/// - The file is not exactly one directory below `root`
/// - Either directory or file stem is not an integer id
pub fn parse_comment_path(path: &Path, root: &Path) -> Result<(PostId, CommentId), ParseError> {
    let rel_path = path
        .strip_prefix(root)
        .map_err(|_| ParseError::InvalidPath)?;

    let segments: Vec<&str> = rel_path
        .components()
        .map(|component| match component {
            Component::Normal(segment) => segment.to_str().ok_or(ParseError::InvalidPath),
            _ => Err(ParseError::InvalidPath),
        })
        .collect::<Result<_, _>>()?;

    let [post, file] = segments.as_slice() else {
        return Err(ParseError::WrongDepth(rel_path.to_path_buf()));
    };

    let stem = file
        .strip_suffix(".md")
        .ok_or_else(|| ParseError::NotMarkdown(rel_path.to_path_buf()))?;

    let post_id = parse_post_dir(post)?;
    let comment_id = CommentId::new(parse_id(stem)?);

    Ok((post_id, comment_id))
}

/// Parse a post id from a directory name.
///
/// # Errors
///
/// Returns an error if the name is not an id as written by [`post_dir`].
pub fn parse_post_dir(name: &str) -> Result<PostId, ParseError> {
    parse_id(name).map(PostId::new)
}

/// Ids in paths are plain decimal digits without leading zeros, so each id
/// has exactly one file name.
fn parse_id(segment: &str) -> Result<u64, ParseError> {
    let id: u64 = segment.parse().map_err(|source| ParseError::InvalidId {
        segment: segment.to_string(),
        source,
    })?;

    let digits_only = segment.bytes().all(|b| b.is_ascii_digit());
    let leading_zero = segment.len() > 1 && segment.starts_with('0');
    if !digits_only || leading_zero {
        return Err(ParseError::NonCanonicalId(segment.to_string()));
    }

    Ok(id)
}

/// The directory holding a post's comments.
#[must_use]
pub fn post_dir(root: &Path, post: PostId) -> PathBuf {
    root.join(post.to_string())
}

/// Construct the file path of a comment.
#[must_use]
pub fn construct_comment_path(root: &Path, post: PostId, id: CommentId) -> PathBuf {
    post_dir(root, post).join(id.to_string()).with_extension("md")
}

/// Errors that can occur when parsing ids from a path.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The path is not under the root or contains non UTF-8 segments.
    #[error("invalid path")]
    InvalidPath,

    /// Comment files must sit directly inside a post directory.
    #[error("expected <post>/<comment>.md, found {}", .0.display())]
    WrongDepth(PathBuf),

    /// The file does not have a `.md` extension.
    #[error("not a markdown file: {}", .0.display())]
    NotMarkdown(PathBuf),

    /// A path segment is not an integer id.
    #[error("invalid id '{segment}'")]
    InvalidId {
        /// The offending segment.
        segment: String,
        /// The underlying integer parse error.
        #[source]
        source: ParseIntError,
    },

    /// A path segment is an integer, but not written the way ids are
    /// written (for example `+7` or `007`).
    #[error("'{0}' is not a canonical id")]
    NonCanonicalId(String),
}
