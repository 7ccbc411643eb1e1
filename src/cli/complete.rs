//! Generate shell completions for the thread CLI.
//!
//! Supports bash, zsh, fish, elvish and `PowerShell`. Save the output to the
//! shell's completion directory.

use std::io;

use clap::CommandFactory;
use clap_complete::Shell;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

impl Command {
    /// Writes the completion script to stdout.
    pub fn run(self) {
        let mut cmd = super::Cli::command();
        clap_complete::generate(self.shell, &mut cmd, "thread", &mut io::stdout());
    }
}
