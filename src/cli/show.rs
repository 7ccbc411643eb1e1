use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use threadline::{
    domain::{CollapsedSet, Walk},
    fetch_forest, CommentId, CommentNode, CommentTree, Directory, Forest, ForestStats, PostId,
};
use tracing::instrument;

use super::terminal::{excerpt, line_width, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Display the reply threads of a post")]
pub struct Show {
    /// The post to display
    post: PostId,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "tree")]
    output: OutputFormat,

    /// Only show the thread starting at this comment
    #[arg(long, value_name = "ID")]
    from: Option<CommentId>,

    /// Hide the replies of these comments
    #[arg(long, value_name = "ID", num_args = 1.., value_delimiter = ',')]
    collapse: Vec<CommentId>,

    /// Maximum reply depth to display (overrides the configured limit)
    #[arg(long, value_name = "N")]
    depth: Option<usize>,

    /// Show only the first line of each comment
    #[arg(long)]
    compact: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Tree,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let directory = Directory::open(root);
        let forest = fetch_forest(&directory, self.post)
            .with_context(|| format!("Failed to load post {}", self.post))?;

        if let Some(from) = self.from {
            if forest.get(from).is_none() {
                anyhow::bail!("Comment {from} not found on post {}", self.post);
            }
        }

        match self.output {
            OutputFormat::Json => self.output_json(&forest)?,
            OutputFormat::Tree => {
                if forest.is_empty() {
                    println!("No comments on post #{} yet.", self.post);
                    return Ok(());
                }
                let depth = self.depth.or_else(|| directory.config().max_depth());
                self.output_tree(&forest, directory.config().indent_width(), depth)?;
            }
        }

        Ok(())
    }

    fn output_json(&self, forest: &Forest) -> anyhow::Result<()> {
        #[derive(serde::Serialize)]
        struct Output {
            post: PostId,
            stats: ForestStats,
            threads: Vec<CommentTree>,
        }

        let mut threads = forest.to_nested();
        if let Some(from) = self.from {
            threads = find_subtree(threads, from).into_iter().collect();
        }

        let output = Output {
            post: self.post,
            stats: ForestStats::from(forest),
            threads,
        };

        let stdout = std::io::stdout();
        serde_json::to_writer_pretty(stdout.lock(), &output)
            .context("Failed to serialize comments")?;
        println!();
        Ok(())
    }

    fn output_tree(
        &self,
        forest: &Forest,
        indent_width: usize,
        depth: Option<usize>,
    ) -> anyhow::Result<()> {
        let collapsed: CollapsedSet = self.collapse.iter().copied().collect();

        let walk = match self.from {
            Some(from) => forest.walk_from(from),
            None => forest.walk(),
        };

        let layout = Layout {
            indent_width,
            depth,
            compact_width: self.compact.then(line_width),
        };

        let stdout = std::io::stdout();
        render_tree(&mut stdout.lock(), forest, walk, &collapsed, &layout)
            .context("Failed to write comments")
    }
}

/// How [`render_tree`] lays out each comment.
struct Layout {
    indent_width: usize,
    depth: Option<usize>,
    /// Line width for single-line excerpts. `None` prints full comments.
    compact_width: Option<usize>,
}

/// Writes every comment reached by `walk`, indented by depth.
///
/// Comments whose replies are not shown (collapsed, or at the depth limit)
/// get a note with the number of hidden replies. Those subtrees are never
/// rendered, so counting them keeps the whole render linear.
fn render_tree<W: Write>(
    out: &mut W,
    forest: &Forest,
    walk: Walk<'_>,
    collapsed: &CollapsedSet,
    layout: &Layout,
) -> io::Result<()> {
    let walk = walk.collapsed(collapsed);
    let walk = match layout.depth {
        Some(depth) => walk.max_depth(depth),
        None => walk,
    };

    for (level, node) in walk {
        let indent = " ".repeat(level * layout.indent_width);
        writeln!(out, "{indent}{}", header(forest, node))?;

        let body_indent = format!("{indent}{}", " ".repeat(layout.indent_width.max(1)));
        match layout.compact_width {
            Some(width) => {
                let width = width.saturating_sub(body_indent.len()).max(20);
                writeln!(out, "{body_indent}{}", excerpt(&node.comment().content, width))?;
            }
            None => {
                for line in node.comment().content.lines() {
                    writeln!(out, "{body_indent}{line}")?;
                }
            }
        }

        let folded = collapsed.contains(node.id()) || layout.depth.is_some_and(|max| level >= max);
        if folded && node.reply_count() > 0 {
            let note = format!("[+{} hidden]", node.thread_size() - 1);
            writeln!(out, "{body_indent}{}", note.dim())?;
        }
    }

    Ok(())
}

/// One line describing a comment: id, author, time, and whether it was
/// promoted to the top level.
fn header(forest: &Forest, node: CommentNode<'_>) -> String {
    let comment = node.comment();
    let mut line = format!(
        "{} {} {}",
        format!("#{}", comment.id).info(),
        comment.author,
        comment.created_at.format("%Y-%m-%d %H:%M").to_string().dim()
    );

    if let (true, Some(parent)) = (node.is_root(), comment.parent_comment_id) {
        let note = if forest.get(parent).is_some() {
            format!("(reply cycle via #{parent})")
        } else {
            format!("(parent #{parent} missing)")
        };
        line.push(' ');
        line.push_str(&note.warning());
    }

    line
}

/// Removes the tree rooted at `id` from `trees`, searching iteratively.
fn find_subtree(trees: Vec<CommentTree>, id: CommentId) -> Option<CommentTree> {
    let mut stack = trees;
    while let Some(tree) = stack.pop() {
        if tree.comment.id == id {
            return Some(tree);
        }
        stack.extend(tree.children);
    }
    None
}
