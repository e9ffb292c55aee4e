//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to launch diagnostic process for {url}: {source}")]
    Launch {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe failed for {url}: {reason}")]
    Probe { url: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn launch(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            url: url.into(),
            source,
        }
    }

    pub fn probe(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Probe {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
