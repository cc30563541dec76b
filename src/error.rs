//! Error types for Spoolchain

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Chain does not start with the genesis block")]
    InvalidGenesis,
    #[error("Block {index} does not link to its parent")]
    BrokenLink { index: usize },
    #[error("Block {index} fails proof-of-work or hash check")]
    InvalidBlock { index: usize },
    #[error("Malformed artifact {name}: {reason}")]
    MalformedArtifact { name: String, reason: String },
    #[error("Spool directory unavailable: {0}")]
    SpoolUnavailable(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChainError {
    /// Fatal errors stop the node; everything else is logged and the loop
    /// carries on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChainError::Config(_) | ChainError::SpoolUnavailable(_))
    }

    pub fn malformed(name: impl Into<String>, reason: impl ToString) -> Self {
        ChainError::MalformedArtifact {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
