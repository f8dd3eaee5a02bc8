//! Settlement outcomes
//!
//! Transport success and business acceptance are separate: a request that
//! reached the service and came back `accepted: false` is an `Ok` value
//! carrying a [`Rejection`], never an `Err`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use super::clawback::{ClawbackCandidate, ClawbackLedger};
use crate::api::{RefundDetails, SettlementResponse};
use crate::classifier::{self, Classification, RecoveryStrategy};
use crate::error::Result;
use crate::intent::IntentKind;
use crate::wallet::CompletedTransfer;

/// Accepted settlement with its typed receipt
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted<T> {
    pub request_id: Option<String>,
    /// `None` when the payload did not match the expected receipt shape
    pub receipt: Option<T>,
    /// Response fields as sent by the service
    pub payload: serde_json::Map<String, serde_json::Value>,
    /// Transfers consumed by this settlement
    pub transfers: Vec<CompletedTransfer>,
}

/// Settlement the service declined
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub request_id: Option<String>,
    pub error_code: Option<String>,
    pub message: String,
    pub classification: Classification,
    pub refund: Option<RefundDetails>,
    /// Transfers left at a custody identity, also recorded in the ledger
    pub clawback_candidates: Vec<ClawbackCandidate>,
}

impl Rejection {
    pub fn needs_clawback(&self) -> bool {
        !self.clawback_candidates.is_empty()
    }
}

/// Result of a submitted operation
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement<T> {
    Accepted(Accepted<T>),
    Rejected(Rejection),
}

impl<T> Settlement<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Settlement::Accepted(_))
    }

    pub fn receipt(&self) -> Option<&T> {
        match self {
            Settlement::Accepted(accepted) => accepted.receipt.as_ref(),
            Settlement::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Settlement::Accepted(_) => None,
            Settlement::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Which transfers a rejection leaves stranded, and how to recover them
fn stranded_candidates(
    kind: IntentKind,
    transfers: &[CompletedTransfer],
    classification: &Classification,
    refund: Option<&RefundDetails>,
) -> Vec<ClawbackCandidate> {
    // Without refund evidence the funds are still at custody, whatever the code says
    let strategy = match (refund, classification.recovery) {
        (None, RecoveryStrategy::AutoRefund | RecoveryStrategy::None) => {
            RecoveryStrategy::ClawbackRecommended
        }
        (_, strategy) => strategy,
    };

    transfers
        .iter()
        .filter(|t| refund.map(|r| !r.covers(&t.transfer_id)).unwrap_or(true))
        .map(|t| ClawbackCandidate::from_transfer(t, kind, strategy))
        .collect()
}

/// Turn a settlement response into a typed outcome, recording stranded transfers
pub(crate) fn interpret<T: DeserializeOwned>(
    kind: IntentKind,
    response: SettlementResponse,
    transfers: Vec<CompletedTransfer>,
    ledger: &ClawbackLedger,
) -> Result<Settlement<T>> {
    if response.accepted {
        // Funds are committed; a receipt we cannot read never turns this into an error
        let receipt = match serde_json::from_value(serde_json::Value::Object(
            response.payload.clone(),
        )) {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                warn!(
                    kind = %kind,
                    request_id = ?response.request_id,
                    error = %e,
                    "Accepted settlement carried an unreadable receipt"
                );
                None
            }
        };
        info!(kind = %kind, request_id = ?response.request_id, "Settlement accepted");
        return Ok(Settlement::Accepted(Accepted {
            request_id: response.request_id,
            receipt,
            payload: response.payload,
            transfers,
        }));
    }

    let (error_code, message, classification) = match &response.error {
        Some(body) => (
            Some(body.error_code.clone()),
            body.message.clone(),
            classifier::classify_error(body),
        ),
        None => (
            None,
            response
                .message
                .clone()
                .unwrap_or_else(|| "settlement rejected without an error body".to_string()),
            classifier::classify(""),
        ),
    };

    let candidates =
        stranded_candidates(kind, &transfers, &classification, response.refund.as_ref());
    for candidate in &candidates {
        ledger.record(candidate.clone());
    }

    warn!(
        kind = %kind,
        code = ?error_code,
        category = %classification.category,
        recovery = %classification.recovery,
        stranded = candidates.len(),
        "Settlement rejected: {}",
        message
    );

    Ok(Settlement::Rejected(Rejection {
        request_id: response.request_id,
        error_code,
        message,
        classification,
        refund: response.refund,
        clawback_candidates: candidates,
    }))
}
