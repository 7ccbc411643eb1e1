use std::path::PathBuf;

use clap::ArgAction;

mod check;
mod complete;
mod init;
mod reply;
mod search;
mod show;
mod status;
mod terminal;

use check::Check;
use reply::Reply;
use search::Search;
use show::Show;
use status::Status;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the root of the discussion directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show comment counts per post (default)
    Status(Status),

    /// Initialize a new discussion directory
    Init(init::Command),

    /// Print the reply threads of a post
    Show(Show),

    /// Add a comment to a post, or reply to an existing comment
    Reply(Reply),

    /// Report orphaned replies and broken reply cycles
    ///
    /// Orphans are replies whose parent is missing. Cycles are chains of
    /// replies that eventually point back at themselves. Both are shown as
    /// top-level comments.
    Check(Check),

    /// Find comments by content and show where they sit in their thread
    Search(Search),

    /// Generate shell completions
    Complete(complete::Command),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root)?,
            Self::Init(command) => command.run(&root)?,
            Self::Show(command) => command.run(root)?,
            Self::Reply(command) => command.run(root)?,
            Self::Check(command) => command.run(root)?,
            Self::Search(command) => command.run(root)?,
            Self::Complete(command) => command.run(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
