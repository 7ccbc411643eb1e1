use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dialoguer::Input;
use threadline::{
    discussion::submit_comment,
    storage::{EnvAuth, StaticAuth, AUTHOR_VAR, USER_ID_VAR},
    AuthProvider, CommentId, Directory, PostId, SubmitError,
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Add a comment to a post")]
pub struct Reply {
    /// The post to comment on
    post: PostId,

    /// Reply to this comment instead of starting a new thread
    #[arg(long, value_name = "ID")]
    parent: Option<CommentId>,

    /// The comment text. Prompted for when omitted.
    #[arg(long, short)]
    content: Option<String>,
}

impl Reply {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let mut directory = Directory::open(root);
        let auth = Self::auth(&directory)?;

        let content = match self.content {
            Some(content) => content,
            None => Input::<String>::new()
                .with_prompt(match self.parent {
                    Some(parent) => format!("Reply to #{parent}"),
                    None => format!("Comment on post #{}", self.post),
                })
                .interact_text()
                .context("Failed to read comment")?,
        };

        match submit_comment(&mut directory, &auth, self.post, self.parent, &content) {
            Ok(comment) => {
                println!(
                    "{}",
                    format!("Added comment #{} to post #{}", comment.id, comment.post_id)
                        .success()
                );
                Ok(())
            }
            Err(SubmitError::Unauthenticated) => anyhow::bail!(
                "No identity found. Set {USER_ID_VAR} and {AUTHOR_VAR}, or add an [identity] \
                 section to {}",
                Directory::config_path(directory.root()).display()
            ),
            Err(e) => Err(e).context("Failed to add comment"),
        }
    }

    /// The environment wins over the configured identity.
    fn auth(directory: &Directory) -> anyhow::Result<StaticAuth> {
        if let Some(identity) = EnvAuth.current_user() {
            return Ok(StaticAuth::signed_in(identity));
        }

        let identity = directory
            .config()
            .identity()
            .context("Invalid identity in configuration")?;
        Ok(StaticAuth::from(identity))
    }
}
