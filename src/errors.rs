use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Chain id mismatch for network {network}: configured {expected}, node reports {actual}")]
    ChainIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Verification error: {0}")]
    Verification(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Price lookup failed: {0}")]
    Pricing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// True when the explorer reports the contract as already verified.
    pub fn is_already_verified(&self) -> bool {
        is_already_verified_message(&self.to_string())
    }
}

pub fn is_already_verified_message(message: &str) -> bool {
    message.to_lowercase().contains("already verified")
}

pub type DeployResult<T> = Result<T, DeployError>;
