use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use regex::{Regex, RegexBuilder};
use threadline::{fetch_forest, Comment, CommentId, Directory, PostId};
use tracing::instrument;

use super::terminal::{excerpt, remaining_width, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Search the comments of a post")]
#[command(group(clap::ArgGroup::new("query").required(true).args(["contains", "regex"])))]
pub struct Search {
    /// The post to search
    post: PostId,

    /// Match comments containing this text (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    contains: Option<String>,

    /// Match comments against a regular expression
    #[arg(long, value_name = "PATTERN")]
    regex: Option<String>,

    /// Also match the author's name
    #[arg(long)]
    author: bool,
}

#[derive(Debug)]
struct Hit<'a> {
    thread: CommentId,
    depth: usize,
    comment: &'a Comment,
}

impl Search {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let matcher = self.matcher()?;

        let directory = Directory::open(root);
        let forest = fetch_forest(&directory, self.post)
            .with_context(|| format!("Failed to load post {}", self.post))?;

        let mut hits = Vec::new();
        let mut thread = None;
        for (depth, node) in forest.walk() {
            if depth == 0 {
                thread = Some(node.id());
            }
            let comment = node.comment();
            let matched = matcher.is_match(&comment.content)
                || (self.author && matcher.is_match(&comment.author));
            if let (true, Some(thread)) = (matched, thread) {
                hits.push(Hit {
                    thread,
                    depth,
                    comment,
                });
            }
        }

        if hits.is_empty() {
            println!("No comments matched.");
            return Ok(());
        }

        for hit in &hits {
            let location = if hit.depth == 0 {
                "thread start".to_string()
            } else {
                format!("depth {} in thread #{}", hit.depth, hit.thread)
            };
            println!(
                "{} {} {}",
                format!("#{}", hit.comment.id).info(),
                hit.comment.author,
                format!("({location})").dim()
            );
            println!("  {}", excerpt(&hit.comment.content, remaining_width(2)));
        }

        println!();
        println!("{} matching comments", hits.len());
        Ok(())
    }

    fn matcher(&self) -> anyhow::Result<Regex> {
        let pattern = match (&self.regex, &self.contains) {
            (Some(pattern), _) => pattern.clone(),
            (None, Some(text)) => regex::escape(text),
            (None, None) => anyhow::bail!("Either --contains or --regex is required"),
        };

        RegexBuilder::new(&pattern)
            .case_insensitive(self.regex.is_none())
            .build()
            .with_context(|| format!("Invalid pattern '{pattern}'"))
    }
}
