use thiserror::Error;

/// Error type for the auditmark root binary.
///
/// Lifecycle failures keep their `BadgeError` so the JSON-RPC layer can map
/// each variant to its own code.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("badge error: {0}")]
    Badge(#[from] auditmark_core::BadgeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RootError {
    fn from(e: serde_json::Error) -> Self {
        RootError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RootError {
    fn from(e: toml::de::Error) -> Self {
        RootError::Config(format!("TOML parse error: {}", e))
    }
}

pub type RootResult<T> = Result<T, RootError>;
