//! Error types for the gateway client

use thiserror::Error;

use crate::api::types::ErrorBody;
use crate::trading::clawback::ClawbackCandidate;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway client
#[derive(Error, Debug)]
pub enum Error {
    // Parameter errors (AMM math, local validation)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid tick {tick}: must lie within [{min}, {max}]")]
    InvalidTick { tick: i64, min: i32, max: i32 },

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    // Policy gate errors
    #[error("Service disabled by master kill-switch")]
    ServiceDisabled,

    #[error("Feature disabled: {feature}")]
    FeatureDisabled { feature: String },

    #[error("Amount {amount} of {asset} below minimum {minimum}")]
    BelowMinimum {
        asset: String,
        amount: u128,
        minimum: u128,
    },

    #[error("Asset not allowed for pool creation: {0}")]
    AssetNotAllowed(String),

    #[error("Settlement service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Insufficient balance of {asset}: {available} available, {required} required")]
    InsufficientBalance {
        asset: String,
        available: u128,
        required: u128,
    },

    // Authentication errors
    #[error("Challenge signature rejected: {0}")]
    SignatureRejected(String),

    #[error("Authentication challenge expired")]
    ChallengeExpired,

    #[error("Authentication expired")]
    AuthExpired,

    #[error("Signing failed: {0}")]
    Signing(String),

    // Intent errors
    #[error("Intent build failed: {0}")]
    IntentBuild(String),

    // Transport / remote errors
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Remote error {}: {}", .0.error_code, .0.message)]
    Remote(Box<ErrorBody>),

    #[error("Unexpected response: {0}")]
    Protocol(String),

    // Transfer / settlement errors
    #[error("Transfer failed: {message} ({} earlier transfer(s) stranded)", stranded.len())]
    TransferFailed {
        message: String,
        stranded: Vec<ClawbackCandidate>,
    },

    #[error("Submit failed after funds moved: {message} ({} transfer(s) stranded)", stranded.len())]
    SubmitFailed {
        message: String,
        stranded: Vec<ClawbackCandidate>,
    },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Address codec error: {0}")]
    Codec(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::ServiceUnavailable(_) | Error::AuthExpired
        )
    }

    /// Check if this error was raised before any funds moved
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Error::InvalidParameter(_)
                | Error::InvalidConfiguration(_)
                | Error::InvalidTick { .. }
                | Error::InvalidPrice(_)
                | Error::ServiceDisabled
                | Error::FeatureDisabled { .. }
                | Error::BelowMinimum { .. }
                | Error::AssetNotAllowed(_)
                | Error::ServiceUnavailable(_)
                | Error::InsufficientBalance { .. }
                | Error::IntentBuild(_)
        )
    }

    /// Transfers left at a custody identity by this failure, if any
    pub fn stranded_transfers(&self) -> &[ClawbackCandidate] {
        match self {
            Error::TransferFailed { stranded, .. } | Error::SubmitFailed { stranded, .. } => {
                stranded
            }
            _ => &[],
        }
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_errors_never_strand_funds() {
        let err = Error::BelowMinimum {
            asset: "btc".to_string(),
            amount: 10,
            minimum: 100,
        };
        assert!(err.is_preflight());
        assert!(err.stranded_transfers().is_empty());
        assert!(!Error::AuthExpired.is_preflight());
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Transport("timeout".to_string()).is_retryable());
        assert!(!Error::ServiceDisabled.is_retryable());
    }
}
