use thiserror::Error;
use uuid::Uuid;

/// Which half of the bridge an error belongs to, for operator-facing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Transfer,
    Claim,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Transfer => write!(f, "transfer"),
            Phase::Claim => write!(f, "claim"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Source transaction id must not be empty")]
    InvalidSourceTx,

    #[error("Transaction not found: {id}")]
    NotFound { id: Uuid },

    #[error("Transaction already claimed in {dest_tx_id}")]
    AlreadyClaimed { dest_tx_id: String },

    #[error("Attestation not available yet (retry later)")]
    AttestationNotReady,

    #[error("Source chain transfer failed: {reason}")]
    Transfer { reason: String },

    #[error("Destination chain claim failed: {reason}")]
    Claim { reason: String },

    #[error("Attestation gateway error: {reason}")]
    Gateway { reason: String },

    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("Store error: {0}")]
    Store(#[from] sled::Error),

    #[error("Store corruption: {reason}")]
    Corrupt { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Returns the bridge phase this error is attributable to, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            BridgeError::Transfer { .. } => Some(Phase::Transfer),
            BridgeError::Claim { .. } | BridgeError::AlreadyClaimed { .. } => Some(Phase::Claim),
            _ => None,
        }
    }

    /// Returns true for conditions the caller should simply retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::AttestationNotReady
                | BridgeError::Gateway { .. }
                | BridgeError::RateLimitExceeded { .. }
                | BridgeError::Network(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
