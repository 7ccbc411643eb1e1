use std::{fs, path::Path};

use threadline::{domain::IdentityConfig, Config, Directory};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// User id to attribute comments to when none is set in the environment
    #[arg(long, requires = "author")]
    user_id: Option<String>,

    /// Display name to attribute comments to
    #[arg(long, requires = "user_id")]
    author: Option<String>,
}

impl Command {
    #[instrument(skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let config_path = Directory::config_path(root);
        let Some(meta_dir) = config_path.parent() else {
            anyhow::bail!("Invalid root: {}", root.display());
        };

        if meta_dir.exists() {
            anyhow::bail!(
                "Discussion directory already initialized (found existing {})",
                meta_dir.display()
            );
        }

        fs::create_dir_all(meta_dir)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", meta_dir.display()))?;

        let mut config = Config::default();
        if let (Some(user_id), Some(author)) = (self.user_id, self.author) {
            config.set_identity(Some(IdentityConfig { user_id, author }));
            config
                .identity()
                .map_err(|e| anyhow::anyhow!("Invalid identity: {e}"))?;
        }

        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        println!(
            "{}",
            format!("Initialized discussion directory in {}", root.display()).success()
        );
        println!("  Created: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("  thread reply <POST> --content \"First!\"");
        println!("  thread show <POST>");

        Ok(())
    }
}
