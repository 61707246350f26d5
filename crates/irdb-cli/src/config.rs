//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
///
/// Both tables default to the embedded resources; a path here replaces them
/// with an external file in the same JSON format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// External protocol catalog, replacing the builtin one.
    pub catalog_path: Option<PathBuf>,

    /// External codeset → device-type/brand mapping, replacing the builtin
    /// one.
    pub codeset_mapping_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (IRDB_*)
        figment = figment.merge(Env::prefixed("IRDB_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for irdb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|path| path.join("irdb"))
}
