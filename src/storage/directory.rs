//! A filesystem backed store of comments
//!
//! The [`Directory`] keeps one directory per post and one markdown file per
//! comment. See [`parse_comment_path`] for the layout.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use chrono::Utc;
use nonempty::NonEmpty;
use rayon::iter::{Either, IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;
use walkdir::WalkDir;

use super::{
    markdown::{LoadError, MarkdownComment},
    path_parser::{construct_comment_path, parse_comment_path, parse_post_dir, post_dir, META_DIR},
    CommentStore, FetchError, InsertError,
};
use crate::domain::{Comment, CommentId, Config, NewComment, PostId};

/// A filesystem backed store of comments.
#[derive(Debug, Clone)]
pub struct Directory {
    /// The root of the directory posts are stored in.
    root: PathBuf,
    config: Config,
}

impl Directory {
    /// Opens a directory at the given path, reading its configuration.
    ///
    /// A missing or invalid configuration file falls back to the defaults.
    #[must_use]
    pub fn open(root: PathBuf) -> Self {
        let config = load_config(&root);
        Self { root, config }
    }

    /// Opens a directory with an explicit configuration.
    #[must_use]
    pub const fn with_config(root: PathBuf, config: Config) -> Self {
        Self { root, config }
    }

    /// The root of the directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The location of the configuration file for a directory rooted at
    /// `root`.
    #[must_use]
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(META_DIR).join("config.toml")
    }

    /// The next free comment id. Ids are unique across all posts.
    fn next_comment_id(&self) -> Result<CommentId, InsertError> {
        if !self.root.exists() {
            return Ok(CommentId::new(1));
        }

        let mut max = 0;
        for entry in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| walk_error(&self.root, e))?;
            if let Ok((_, id)) = parse_comment_path(entry.path(), &self.root) {
                max = max.max(id.get());
            }
        }

        max.checked_add(1)
            .map(CommentId::new)
            .ok_or(InsertError::IdsExhausted)
    }
}

impl CommentStore for Directory {
    #[instrument(level = "debug", skip(self))]
    fn posts(&self) -> Result<Vec<PostId>, FetchError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.root).map_err(|source| FetchError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut posts: Vec<PostId> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                if name.starts_with('.') {
                    return None;
                }
                parse_post_dir(name).ok()
            })
            .collect();

        posts.sort_unstable();
        Ok(posts)
    }

    /// Loads every comment file of a post.
    ///
    /// If `allow_unrecognised` is `false` (the default), any markdown file in
    /// the post directory that is not a valid comment makes the fetch fail.
    /// Otherwise such files are skipped.
    #[instrument(level = "debug", skip(self))]
    fn comments_for_post(&self, post: PostId) -> Result<Vec<Comment>, FetchError> {
        let dir = post_dir(&self.root, post);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let md_paths = collect_markdown_paths(&dir)?;

        let (mut comments, mut unrecognised): (Vec<Comment>, Vec<PathBuf>) = md_paths
            .par_iter()
            .partition_map(|path| match try_load_comment(path, &self.root, post) {
                Ok(comment) => Either::Left(comment),
                Err(path) => Either::Right(path),
            });

        unrecognised.sort();
        if let Some(paths) = NonEmpty::from_vec(unrecognised) {
            if !self.config.allow_unrecognised {
                return Err(FetchError::UnrecognisedFiles(paths));
            }
            tracing::warn!("Skipped {} unrecognised files in post {post}", paths.len());
        }

        comments.sort_by_key(|comment| (comment.created_at, comment.id));
        Ok(comments)
    }

    #[instrument(skip(self, comment), fields(post = %comment.post_id))]
    fn insert(&mut self, comment: NewComment) -> Result<Comment, InsertError> {
        if let Some(parent) = comment.parent_comment_id {
            if !construct_comment_path(&self.root, comment.post_id, parent).is_file() {
                return Err(InsertError::ParentNotFound {
                    post: comment.post_id,
                    parent,
                });
            }
        }

        let id = self.next_comment_id()?;
        let comment = comment.into_comment(id, Utc::now());

        let path = construct_comment_path(&self.root, comment.post_id, id);
        MarkdownComment::from(&comment)
            .save_to_path(&path)
            .map_err(|source| InsertError::Io { path, source })?;

        tracing::info!("Added comment {id} to post {}", comment.post_id);

        Ok(comment)
    }
}

fn load_config(root: &Path) -> Config {
    let path = Directory::config_path(root);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

fn collect_markdown_paths(dir: &Path) -> Result<Vec<PathBuf>, FetchError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if entry.file_type().is_file() && entry.path().extension() == Some(OsStr::new("md")) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn walk_error(root: &Path, error: walkdir::Error) -> FetchError {
    let path = error.path().unwrap_or(root).to_path_buf();
    FetchError::Io {
        path,
        source: error.into(),
    }
}

fn try_load_comment(path: &Path, root: &Path, post: PostId) -> Result<Comment, PathBuf> {
    let id = match parse_comment_path(path, root) {
        Ok((found_post, id)) if found_post == post => id,
        Ok(_) => return Err(path.to_path_buf()),
        Err(e) => {
            tracing::debug!(
                "Skipping file with invalid comment path at {}: {:?}",
                path.display(),
                e
            );
            return Err(path.to_path_buf());
        }
    };

    MarkdownComment::load(path)
        .map(|markdown| markdown.into_comment(post, id))
        .map_err(|e: LoadError| {
            tracing::debug!("Failed to load comment from {}: {:?}", path.display(), e);
            path.to_path_buf()
        })
}
