use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::comment::{Identity, InvalidIdentity};

/// Configuration for a discussion directory.
///
/// Stored at `.threads/config.toml` in the directory root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Whether post directories may contain markdown files that are not
    /// valid comments.
    ///
    /// When `false` (the default), such files make loading the post fail.
    /// When `true`, they are skipped with a warning.
    pub allow_unrecognised: bool,

    /// Number of spaces per reply level when rendering threads.
    indent_width: usize,

    /// Maximum reply depth to render. `0` means unlimited.
    max_depth: usize,

    /// The user comments are attributed to when no other identity is
    /// available.
    identity: Option<IdentityConfig>,
}

/// A user identity as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// The user's identifier.
    pub user_id: String,
    /// The user's display name.
    pub author: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_unrecognised: false,
            indent_width: default_indent_width(),
            max_depth: 0,
            identity: None,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the number of spaces per reply level.
    #[must_use]
    pub const fn indent_width(&self) -> usize {
        self.indent_width
    }

    /// Returns the render depth limit, or `None` when unlimited.
    #[must_use]
    pub const fn max_depth(&self) -> Option<usize> {
        if self.max_depth == 0 {
            None
        } else {
            Some(self.max_depth)
        }
    }

    /// Sets the render depth limit. `0` means unlimited.
    pub const fn set_max_depth(&mut self, depth: usize) {
        self.max_depth = depth;
    }

    /// Sets the fallback identity.
    pub fn set_identity(&mut self, identity: Option<IdentityConfig>) {
        self.identity = identity;
    }

    /// The configured fallback identity, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured identity has a blank field.
    pub fn identity(&self) -> Result<Option<Identity>, InvalidIdentity> {
        self.identity
            .as_ref()
            .map(|identity| Identity::new(identity.user_id.clone(), identity.author.clone()))
            .transpose()
    }
}

const fn default_indent_width() -> usize {
    2
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        allow_unrecognised: bool,

        #[serde(default = "default_indent_width")]
        indent_width: usize,

        #[serde(default)]
        max_depth: usize,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<IdentityConfig>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                allow_unrecognised,
                indent_width,
                max_depth,
                identity,
            } => Self {
                allow_unrecognised,
                indent_width,
                max_depth,
                identity,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            allow_unrecognised: config.allow_unrecognised,
            indent_width: config.indent_width,
            max_depth: config.max_depth,
            identity: config.identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nallow_unrecognised = true\nindent_width = 4\nmax_depth = 3\n\n[identity]\nuser_id = \"u-1\"\nauthor = \"alice\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert!(config.allow_unrecognised);
        assert_eq!(config.indent_width(), 4);
        assert_eq!(config.max_depth(), Some(3));
        let identity = config.identity().unwrap().unwrap();
        assert_eq!(identity.author(), "alice");
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nindent_width = \"wide\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(actual.max_depth(), None);
    }

    #[test]
    fn save_then_load_keeps_identity() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.set_max_depth(5);
        config.set_identity(Some(IdentityConfig {
            user_id: "u-9".to_string(),
            author: "bob".to_string(),
        }));
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn blank_identity_is_rejected() {
        let config: Config =
            toml::from_str("_version = \"1\"\n[identity]\nuser_id = \"u\"\nauthor = \"\"\n")
                .unwrap();
        assert_eq!(config.identity(), Err(InvalidIdentity::EmptyAuthor));
    }
}
