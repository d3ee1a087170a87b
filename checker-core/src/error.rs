//! Error types.
//!
//! - Remote service failures surface from workflow methods after the
//!   method has reset its loading flag.
//! - Storage failures are recovered where state is loaded (falling back to
//!   defaults) and logged where state is written.
//! - Configuration failures surface when loading the config file.

use std::path::PathBuf;

/// Failure of one of the remote text services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteServiceError {
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service responded with status {status}")]
    Status {
        /// HTTP-style status code.
        status: u16,
    },

    /// The service answered with something that is not usable text.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Failure of the durable key-value storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage i/o failed for {path}: {source}")]
    Io {
        /// File backing the key.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized for storage.
    #[error("could not serialize value for key {key}: {source}")]
    Serialize {
        /// Storage key.
        key: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to load the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("could not read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::config::CheckerConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error for setting up and driving the checker.
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    /// A remote service failed.
    #[error(transparent)]
    Remote(#[from] RemoteServiceError),

    /// Storage could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
