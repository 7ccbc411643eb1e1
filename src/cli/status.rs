use std::{path::PathBuf, process};

use anyhow::Context;
use clap::Parser;
use threadline::{fetch_forest, CommentStore, Directory, ForestStats, PostId};
use tracing::instrument;

use super::terminal::{is_narrow, Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "Show comment counts for every post")]
pub struct Status {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, serde::Serialize)]
struct PostStatus {
    post: PostId,
    #[serde(flatten)]
    stats: ForestStats,
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::open(root);

        let posts = directory
            .posts()
            .with_context(|| format!("Failed to list posts in {}", directory.root().display()))?;

        let mut statuses = Vec::with_capacity(posts.len());
        for post in posts {
            let forest = fetch_forest(&directory, post)
                .with_context(|| format!("Failed to load post {post}"))?;
            statuses.push(PostStatus {
                post,
                stats: ForestStats::from(&forest),
            });
        }

        if statuses.is_empty() {
            println!("No comments found yet. Add one with 'thread reply <POST>'.");
            return Ok(());
        }

        match self.output {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            }
            OutputFormat::Table => {
                if self.quiet {
                    Self::output_quiet(&statuses);
                } else {
                    Self::output_table(&statuses);
                }
            }
        }

        // Broken reply chains need attention.
        if statuses.iter().any(|s| s.stats.cycle_promotions > 0) {
            process::exit(3);
        }

        Ok(())
    }

    fn output_quiet(statuses: &[PostStatus]) {
        for PostStatus { post, stats } in statuses {
            println!(
                "post={post} total={} roots={} orphans={} cycles={}",
                stats.total_comments, stats.root_comments, stats.orphans, stats.cycle_promotions
            );
        }
    }

    fn output_table(statuses: &[PostStatus]) {
        println!("Comment counts");
        println!("{}", "──────────────".dim());

        if is_narrow() {
            for PostStatus { post, stats } in statuses {
                println!(
                    "#{post}: {} comments in {} threads",
                    stats.total_comments, stats.root_comments
                );
            }
        } else {
            println!(
                "{:<8} {:<8} {:<8} {:<8} {:<8} Depth",
                "Post", "Total", "Threads", "Orphans", "Cycles"
            );
            for PostStatus { post, stats } in statuses {
                println!(
                    "{:<8} {:<8} {:<8} {:<8} {:<8} {}",
                    format!("#{post}"),
                    stats.total_comments,
                    stats.root_comments,
                    stats.orphans,
                    stats.cycle_promotions,
                    stats.max_depth
                );
            }
        }

        let total: usize = statuses.iter().map(|s| s.stats.total_comments).sum();
        println!();
        println!("Total: {total}");

        let broken: usize = statuses
            .iter()
            .map(|s| s.stats.orphans + s.stats.cycle_promotions)
            .sum();
        if broken == 0 {
            println!("Broken reply chains: {} ✅", "0".success());
        } else {
            println!("Broken reply chains: {} ⚠️", broken.to_string().warning());
            println!("{}", "Run 'thread check <POST>' to investigate.".dim());
        }
    }
}
