use std::{path::PathBuf, process};

use anyhow::Context;
use clap::Parser;
use threadline::{fetch_forest, CommentId, CommentNode, Directory, PostId};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Report replies that could not be attached to their parent")]
pub struct Check {
    /// The post to check
    post: PostId,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Exit with a non-zero code when orphaned replies are found
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, serde::Serialize)]
struct Promotion {
    id: CommentId,
    parent: Option<CommentId>,
    author: String,
}

impl From<CommentNode<'_>> for Promotion {
    fn from(node: CommentNode<'_>) -> Self {
        let comment = node.comment();
        Self {
            id: comment.id,
            parent: comment.parent_comment_id,
            author: comment.author.clone(),
        }
    }
}

impl Check {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::open(root);
        let forest = fetch_forest(&directory, self.post)
            .with_context(|| format!("Failed to load post {}", self.post))?;

        let orphans: Vec<Promotion> = forest.orphans().map(Promotion::from).collect();
        let cycles: Vec<Promotion> = forest.cycle_promotions().map(Promotion::from).collect();

        match self.output {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "post": self.post,
                    "orphans": orphans,
                    "cycles": cycles,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => self.output_table(&orphans, &cycles),
        }

        let mut exit_code = 0;
        if !cycles.is_empty() {
            exit_code = exit_code.max(3);
        }
        if self.strict && !orphans.is_empty() {
            exit_code = exit_code.max(2);
        }

        if exit_code != 0 {
            process::exit(exit_code);
        }

        Ok(())
    }

    fn output_table(&self, orphans: &[Promotion], cycles: &[Promotion]) {
        if orphans.is_empty() && cycles.is_empty() {
            println!(
                "{}",
                format!("✅ Every reply on post #{} is attached.", self.post).success()
            );
            return;
        }

        if !orphans.is_empty() {
            println!("Orphaned replies: {} ⚠️", orphans.len().to_string().warning());
            for orphan in orphans {
                let parent = orphan.parent.map_or_else(String::new, |p| format!("#{p}"));
                println!("  #{} by {} (parent {parent} missing)", orphan.id, orphan.author);
            }
            println!();
        }

        if !cycles.is_empty() {
            println!("Reply cycles broken: {} ⚠️", cycles.len().to_string().warning());
            for member in cycles {
                let parent = member.parent.map_or_else(String::new, |p| format!("#{p}"));
                println!("  #{} by {} -> {parent}", member.id, member.author);
            }
            println!(
                "{}",
                "These comments are shown as top-level comments.".dim()
            );
        }
    }
}
