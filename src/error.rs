use std::path::PathBuf;

use preparable_core::PrepareError;

/// Errors surfaced by the orchestration entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Preparing the tree failed.
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// The renderer rejected the prepared tree.
    #[error("rendering failed")]
    Render(#[source] anyhow::Error),

    /// Mounting was asked to inject data for a binding the payload lacks.
    #[error("no prefetched data for binding `{binding}`")]
    MissingPrefetchedData {
        /// Name of the binding.
        binding: String,
    },

    /// A mounted application already owns the current nexus of this thread.
    #[error("a nexus is already mounted on this thread")]
    NexusAlreadyMounted,

    /// The configuration file could not be read.
    #[error("failed to read config file {}", path.display())]
    ConfigRead {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config file {}", path.display())]
    ConfigParse {
        /// Path of the file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    /// The preparation error, if that is what failed.
    #[must_use]
    pub const fn as_prepare(&self) -> Option<&PrepareError> {
        match self {
            Self::Prepare(error) => Some(error),
            _ => None,
        }
    }
}
