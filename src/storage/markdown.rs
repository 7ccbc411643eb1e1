use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, CommentId, PostId, UserId};

/// A comment serialized in markdown format with YAML frontmatter.
///
/// The comment and post ids are not stored in the file; they come from its
/// path (see [`parse_comment_path`](super::parse_comment_path)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownComment {
    frontmatter: FrontMatter,
    body: String,
}

impl MarkdownComment {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let frontmatter = serde_yaml::to_string(&self.frontmatter).expect("this must never fail");

        let result = if self.body.is_empty() {
            format!("---\n{frontmatter}---\n")
        } else {
            format!("---\n{frontmatter}---\n{}\n", self.body)
        };

        writer.write_all(result.as_bytes())
    }

    pub(crate) fn read<R: BufRead>(reader: &mut R) -> Result<Self, LoadError> {
        let mut lines = reader.lines();

        // Ensure frontmatter starts correctly
        let first_line = lines
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "Empty input"))?
            .map_err(LoadError::from)?;

        if first_line.trim() != "---" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Expected frontmatter starting with '---'",
            )
            .into());
        }

        // Collect lines until next '---'
        let frontmatter = lines
            .by_ref()
            .map_while(|line| match line {
                Ok(content) if content.trim() == "---" => None,
                Ok(content) => Some(Ok(content)),
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");

        // The rest of the lines are the comment body
        let body = lines.collect::<Result<Vec<_>, _>>()?.join("\n");

        let frontmatter: FrontMatter = serde_yaml::from_str(&frontmatter)?;

        Ok(Self {
            frontmatter,
            body: body.trim_end().to_string(),
        })
    }

    /// Reads a comment file from the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }

    /// Writes the comment to a specific file path.
    ///
    /// Parent directories are created automatically if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_path(&self, file_path: &Path) -> io::Result<()> {
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(file_path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()
    }

    /// Completes the record with the ids taken from the file's location.
    #[must_use]
    pub fn into_comment(self, post_id: PostId, id: CommentId) -> Comment {
        let FrontMatter {
            parent,
            user_id,
            author,
            created,
        } = self.frontmatter;

        Comment {
            id,
            post_id,
            parent_comment_id: parent,
            content: self.body,
            user_id,
            author,
            created_at: created,
        }
    }
}

impl From<&Comment> for MarkdownComment {
    fn from(comment: &Comment) -> Self {
        Self {
            frontmatter: FrontMatter {
                parent: comment.parent_comment_id,
                user_id: comment.user_id.clone(),
                author: comment.author.clone(),
                created: comment.created_at,
            },
            body: comment.content.trim_end().to_string(),
        }
    }
}

/// Errors that can occur when loading a comment from markdown.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The comment file was not found.
    #[error("comment file not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to read comment file")]
    Io(#[from] io::Error),
    /// The YAML frontmatter could not be parsed.
    #[error("invalid frontmatter")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "FrontMatterVersion")]
#[serde(into = "FrontMatterVersion")]
struct FrontMatter {
    parent: Option<CommentId>,
    user_id: UserId,
    author: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum FrontMatterVersion {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<CommentId>,
        user_id: UserId,
        author: String,
        created: DateTime<Utc>,
    },
}

impl From<FrontMatterVersion> for FrontMatter {
    fn from(version: FrontMatterVersion) -> Self {
        match version {
            FrontMatterVersion::V1 {
                parent,
                user_id,
                author,
                created,
            } => Self {
                parent,
                user_id,
                author,
                created,
            },
        }
    }
}

impl From<FrontMatter> for FrontMatterVersion {
    fn from(front_matter: FrontMatter) -> Self {
        let FrontMatter {
            parent,
            user_id,
            author,
            created,
        } = front_matter;
        Self::V1 {
            parent,
            user_id,
            author,
            created,
        }
    }
}
