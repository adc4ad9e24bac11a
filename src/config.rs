//! File-based configuration.
//!
//! ```toml
//! [prepare]
//! unmount = "after-subtree"
//! log-counts = true
//!
//! [log]
//! filter = "preparable=debug"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use preparable_core::{PrepareOptions, Preparer};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Name of the configuration file looked up by [`Config::path`].
pub const CONFIG_FILE_NAME: &str = "preparable.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Options of every preparation pass.
    pub prepare: PrepareOptions,
    /// Logging setup used by [`logging::install`](crate::logging::install).
    pub log: LogConfig,
}

/// Logging section of [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LogConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
    /// Colorize output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: true,
        }
    }
}

fn default_filter() -> String {
    "info".to_owned()
}

impl Config {
    /// Reads the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Reads `preparable.toml` under `root`, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, Error> {
        let path = Self::path(root.as_ref());
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Location of the configuration file under `root`.
    #[must_use]
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// A preparer configured with [`Config::prepare`].
    #[must_use]
    pub fn preparer(&self) -> Preparer {
        Preparer::with_options(self.prepare)
    }
}
