//! Remote error classification
//!
//! Maps settlement error codes (`<PREFIX>-<NNNN>`) to a category, a recovery
//! strategy and a retry policy. Known codes come from [`ERROR_TABLE`];
//! anything else falls back to its numeric range with the most conservative
//! recovery.
//!
//! | Range     | Category       | Default recovery      | Default retry        |
//! |-----------|----------------|-----------------------|----------------------|
//! | 1000-1999 | Validation     | clawback required     | not retryable        |
//! | 2000-2999 | Security       | clawback required     | not retryable        |
//! | 2100-2199 | Security (auth)| none                  | after re-auth        |
//! | 3000-3999 | Infrastructure | clawback recommended  | with backoff         |
//! | 4000-4999 | Business       | auto refund           | after adjusting      |
//! | 5000-5999 | System         | clawback required     | not retryable        |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::api::types::ErrorBody;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Validation,
    Security,
    Infrastructure,
    Business,
    System,
}

impl FromStr for ErrorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "validation" => Ok(ErrorCategory::Validation),
            "security" => Ok(ErrorCategory::Security),
            "infrastructure" | "infra" => Ok(ErrorCategory::Infrastructure),
            "business" => Ok(ErrorCategory::Business),
            "system" => Ok(ErrorCategory::System),
            other => Err(format!("unknown error category '{}'", other)),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::Infrastructure => write!(f, "infrastructure"),
            ErrorCategory::Business => write!(f, "business"),
            ErrorCategory::System => write!(f, "system"),
        }
    }
}

/// How funds at a custody identity get back to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    ClawbackRequired,
    ClawbackRecommended,
    AutoRefund,
    None,
}

impl RecoveryStrategy {
    /// Whether the client should initiate a clawback
    pub fn needs_clawback(&self) -> bool {
        matches!(
            self,
            RecoveryStrategy::ClawbackRequired | RecoveryStrategy::ClawbackRecommended
        )
    }
}

impl std::fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryStrategy::ClawbackRequired => write!(f, "clawback_required"),
            RecoveryStrategy::ClawbackRecommended => write!(f, "clawback_recommended"),
            RecoveryStrategy::AutoRefund => write!(f, "auto_refund"),
            RecoveryStrategy::None => write!(f, "none"),
        }
    }
}

/// When, if ever, the same operation may be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retryability {
    NotRetryable,
    WithBackoff,
    AfterAdjustingParameters,
    AfterReauthentication,
}

impl std::fmt::Display for Retryability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Retryability::NotRetryable => write!(f, "not_retryable"),
            Retryability::WithBackoff => write!(f, "with_backoff"),
            Retryability::AfterAdjustingParameters => write!(f, "after_adjusting_parameters"),
            Retryability::AfterReauthentication => write!(f, "after_reauthentication"),
        }
    }
}

/// One row of the code table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub category: ErrorCategory,
    pub recovery: RecoveryStrategy,
    pub retryability: Retryability,
}

/// Result of classifying one error code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub code: String,
    pub category: ErrorCategory,
    pub recovery: RecoveryStrategy,
    pub retryability: Retryability,
    /// False when the code was not in the table
    pub known: bool,
}

const fn row(
    code: &'static str,
    name: &'static str,
    category: ErrorCategory,
    recovery: RecoveryStrategy,
    retryability: Retryability,
) -> ErrorCodeInfo {
    ErrorCodeInfo {
        code,
        name,
        category,
        recovery,
        retryability,
    }
}

use ErrorCategory::*;
use RecoveryStrategy::{AutoRefund, ClawbackRecommended, ClawbackRequired};
use Retryability::*;

/// Known settlement error codes
pub const ERROR_TABLE: &[ErrorCodeInfo] = &[
    // Validation
    row("AMM-1001", "invalid_parameter", Validation, ClawbackRequired, NotRetryable),
    row("AMM-1002", "invalid_amount", Validation, ClawbackRequired, NotRetryable),
    row("AMM-1003", "invalid_nonce", Validation, ClawbackRequired, NotRetryable),
    row("AMM-1004", "pool_not_found", Validation, ClawbackRequired, NotRetryable),
    row("AMM-1005", "asset_mismatch", Validation, ClawbackRequired, NotRetryable),
    row("AMM-1006", "invalid_tick_range", Validation, ClawbackRequired, NotRetryable),
    row("AMM-1007", "amount_below_minimum", Validation, ClawbackRequired, NotRetryable),
    row("AMM-1008", "transfer_not_found", Validation, ClawbackRequired, NotRetryable),
    // Security
    row("AMM-2001", "invalid_signature", Security, ClawbackRequired, NotRetryable),
    row("AMM-2002", "signer_mismatch", Security, ClawbackRequired, NotRetryable),
    row("AMM-2003", "transfer_sender_mismatch", Security, ClawbackRequired, NotRetryable),
    row("AMM-2004", "nonce_replayed", Security, ClawbackRequired, NotRetryable),
    row("AMM-2101", "auth_token_expired", Security, RecoveryStrategy::None, AfterReauthentication),
    row("AMM-2102", "auth_token_invalid", Security, RecoveryStrategy::None, AfterReauthentication),
    row("AMM-2103", "auth_challenge_expired", Security, RecoveryStrategy::None, AfterReauthentication),
    // Infrastructure
    row("AMM-3001", "ledger_unavailable", Infrastructure, ClawbackRecommended, WithBackoff),
    row("AMM-3002", "upstream_timeout", Infrastructure, ClawbackRecommended, WithBackoff),
    row("AMM-3003", "transfer_unconfirmed", Infrastructure, ClawbackRecommended, WithBackoff),
    row("AMM-3004", "rate_limited", Infrastructure, ClawbackRecommended, WithBackoff),
    // Business
    row("AMM-4001", "insufficient_liquidity", Business, AutoRefund, AfterAdjustingParameters),
    row("AMM-4002", "pool_paused", Business, AutoRefund, AfterAdjustingParameters),
    row("AMM-4003", "slippage_exceeded", Business, AutoRefund, AfterAdjustingParameters),
    row("AMM-4004", "feature_disabled", Business, AutoRefund, AfterAdjustingParameters),
    row("AMM-4005", "escrow_expired", Business, AutoRefund, AfterAdjustingParameters),
    row("AMM-4006", "escrow_overfunded", Business, AutoRefund, AfterAdjustingParameters),
    row("AMM-4007", "pool_graduated", Business, AutoRefund, AfterAdjustingParameters),
    // System
    row("AMM-5001", "internal_error", System, ClawbackRequired, NotRetryable),
    row("AMM-5002", "storage_failure", System, ClawbackRequired, NotRetryable),
    row("AMM-5003", "settlement_inconsistent", System, ClawbackRequired, NotRetryable),
];

/// Code the service returns when a login challenge has lapsed
pub const CHALLENGE_EXPIRED_CODE: &str = "AMM-2103";

/// Numeric part of a `<PREFIX>-<NNNN>` code within 1000..=5999
pub fn parse_code_number(code: &str) -> Option<u16> {
    let (prefix, digits) = code.rsplit_once('-')?;
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number: u16 = digits.parse().ok()?;
    (1000..=5999).contains(&number).then_some(number)
}

/// Whether the code belongs to the auth-only sub-range
pub fn is_auth_code(code: &str) -> bool {
    matches!(parse_code_number(code), Some(2100..=2199))
}

pub fn lookup(code: &str) -> Option<&'static ErrorCodeInfo> {
    ERROR_TABLE.iter().find(|info| info.code == code)
}

fn range_default(number: u16) -> (ErrorCategory, RecoveryStrategy, Retryability) {
    match number {
        1000..=1999 => (Validation, ClawbackRequired, NotRetryable),
        2100..=2199 => (Security, RecoveryStrategy::None, AfterReauthentication),
        2000..=2999 => (Security, ClawbackRequired, NotRetryable),
        3000..=3999 => (Infrastructure, ClawbackRequired, NotRetryable),
        4000..=4999 => (Business, ClawbackRequired, NotRetryable),
        _ => (System, ClawbackRequired, NotRetryable),
    }
}

/// Classify an error code
pub fn classify(code: &str) -> Classification {
    if let Some(info) = lookup(code) {
        return Classification {
            code: code.to_string(),
            category: info.category,
            recovery: info.recovery,
            retryability: info.retryability,
            known: true,
        };
    }

    let (category, recovery, retryability) = match parse_code_number(code) {
        Some(number) => range_default(number),
        None => (System, ClawbackRequired, NotRetryable),
    };

    Classification {
        code: code.to_string(),
        category,
        recovery,
        retryability,
        known: false,
    }
}

/// Classify a structured error body, noting category disagreements
pub fn classify_error(body: &ErrorBody) -> Classification {
    let classification = classify(&body.error_code);

    if let Some(declared) = body.error_category.as_deref() {
        match declared.parse::<ErrorCategory>() {
            Ok(category) if category == classification.category => {}
            Ok(category) => warn!(
                code = %body.error_code,
                declared = %category,
                local = %classification.category,
                request_id = ?body.request_id,
                "Server error category disagrees with local table"
            ),
            Err(_) => warn!(
                code = %body.error_code,
                declared = %declared,
                "Server declared an unknown error category"
            ),
        }
    }

    classification
}
