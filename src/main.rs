//! `thread` rebuilds and browses the reply threads of a plain-text discussion
//! directory.

use clap::Parser;

mod cli;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
