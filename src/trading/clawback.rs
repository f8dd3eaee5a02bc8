//! Clawback of stranded transfers
//!
//! A transfer becomes a candidate when it irrevocably reached a custody
//! identity and settlement did not confirm consuming it. Candidates live in
//! a shared [`ClawbackLedger`]; each clawback attempt is reported per
//! transfer.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::orchestrator::Orchestrator;
use super::outcome::Settlement;
use crate::api::ClawbackEligibility;
use crate::classifier::RecoveryStrategy;
use crate::error::Result;
use crate::intent::{Intent, IntentKind};
use crate::wallet::CompletedTransfer;

/// Transfer awaiting recovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClawbackCandidate {
    pub transfer_id: String,
    pub custody_public_key: String,
    pub asset: String,
    #[serde(with = "crate::api::types::amount")]
    pub amount: u128,
    pub strategy: RecoveryStrategy,
    /// Operation that moved the funds
    pub operation: IntentKind,
    pub attempted: bool,
    pub succeeded: bool,
    pub recorded_at: DateTime<Utc>,
}

impl ClawbackCandidate {
    pub fn from_transfer(
        transfer: &CompletedTransfer,
        operation: IntentKind,
        strategy: RecoveryStrategy,
    ) -> Self {
        Self {
            transfer_id: transfer.transfer_id.clone(),
            custody_public_key: transfer.custody_public_key.clone(),
            asset: transfer.asset.clone(),
            amount: transfer.amount,
            strategy,
            operation,
            attempted: false,
            succeeded: false,
            recorded_at: Utc::now(),
        }
    }
}

/// Per-transfer clawback outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClawbackResult {
    pub transfer_id: String,
    pub succeeded: bool,
    pub request_id: Option<String>,
    pub error: Option<String>,
}

/// Concurrent record of stranded transfers, keyed by transfer id
#[derive(Default)]
pub struct ClawbackLedger {
    entries: DashMap<String, ClawbackCandidate>,
    /// Transfers with a clawback currently being submitted
    in_flight: DashSet<String>,
}

impl ClawbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate; an existing entry for the same transfer is kept
    pub fn record(&self, candidate: ClawbackCandidate) {
        let transfer_id = candidate.transfer_id.clone();
        let entry = self.entries.entry(transfer_id.clone()).or_insert(candidate);
        warn!(
            transfer_id = %transfer_id,
            custody = %entry.custody_public_key,
            amount = entry.amount,
            strategy = %entry.strategy,
            "Transfer recorded for clawback"
        );
    }

    pub fn get(&self, transfer_id: &str) -> Option<ClawbackCandidate> {
        self.entries.get(transfer_id).map(|e| e.value().clone())
    }

    /// Candidates not yet recovered
    pub fn pending(&self) -> Vec<ClawbackCandidate> {
        let mut pending: Vec<_> = self
            .entries
            .iter()
            .filter(|e| !e.succeeded)
            .map(|e| e.value().clone())
            .collect();
        pending.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
        pending
    }

    pub fn mark_attempt(&self, transfer_id: &str, succeeded: bool) {
        if let Some(mut entry) = self.entries.get_mut(transfer_id) {
            entry.attempted = true;
            entry.succeeded = entry.succeeded || succeeded;
        }
    }

    /// Reserve a transfer for one clawback attempt; false if another attempt holds it
    pub fn claim(&self, transfer_id: &str) -> bool {
        self.in_flight.insert(transfer_id.to_string())
    }

    pub fn release(&self, transfer_id: &str) {
        self.in_flight.remove(transfer_id);
    }

    /// Drop recovered entries, returning how many were removed
    pub fn prune_recovered(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.succeeded);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Orchestrator {
    /// Ask the service whether a transfer can still be clawed back
    pub async fn check_clawback_eligibility(&self, transfer_id: &str) -> Result<ClawbackEligibility> {
        self.auth()
            .with_reauth(|token| async move {
                self.api()
                    .check_clawback_eligibility(transfer_id, token.value())
                    .await
            })
            .await
    }

    /// Request clawback of each candidate, one signed intent per transfer
    pub async fn clawback(&self, candidates: &[ClawbackCandidate]) -> Result<Vec<ClawbackResult>> {
        self.policy().preflight(IntentKind::Clawback).await?;

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            self.ledger().record(candidate.clone());
            if !self.ledger().claim(&candidate.transfer_id) {
                warn!(transfer_id = %candidate.transfer_id, "Clawback already in progress");
                results.push(ClawbackResult {
                    transfer_id: candidate.transfer_id.clone(),
                    succeeded: false,
                    request_id: None,
                    error: Some("clawback already in progress".to_string()),
                });
                continue;
            }
            results.push(self.clawback_claimed(candidate).await);
        }

        Ok(results)
    }

    /// Claw back every unrecovered ledger entry whose strategy calls for it
    pub async fn recover_stranded(&self) -> Result<Vec<ClawbackResult>> {
        self.policy().preflight(IntentKind::Clawback).await?;

        // Claimed with no await in between, so concurrent callers split the work
        let claimed: Vec<_> = self
            .ledger()
            .pending()
            .into_iter()
            .filter(|c| c.strategy.needs_clawback())
            .filter(|c| self.ledger().claim(&c.transfer_id))
            .collect();
        if claimed.is_empty() {
            return Ok(Vec::new());
        }

        info!(count = claimed.len(), "Recovering stranded transfers");
        let mut results = Vec::with_capacity(claimed.len());
        for candidate in &claimed {
            results.push(self.clawback_claimed(candidate).await);
        }

        let pruned = self.ledger().prune_recovered();
        debug!(pruned, "Recovered transfers removed from ledger");
        Ok(results)
    }

    /// Submit one clawback for a transfer this caller has claimed, then release it
    async fn clawback_claimed(&self, candidate: &ClawbackCandidate) -> ClawbackResult {
        let sender = self.user_public_key().to_string();
        let settled = self
            .settle::<serde_json::Value, _>(IntentKind::Clawback, Vec::new(), |nonce| {
                Intent::builder(IntentKind::Clawback)
                    .field("senderPublicKey", sender.as_str())
                    .field("transferId", candidate.transfer_id.as_str())
                    .field("custodyPublicKey", candidate.custody_public_key.as_str())
                    .build(nonce)
            })
            .await;

        let result = match settled {
            Ok(Settlement::Accepted(accepted)) => ClawbackResult {
                transfer_id: candidate.transfer_id.clone(),
                succeeded: true,
                request_id: accepted.request_id,
                error: None,
            },
            Ok(Settlement::Rejected(rejection)) => ClawbackResult {
                transfer_id: candidate.transfer_id.clone(),
                succeeded: false,
                request_id: rejection.request_id,
                error: Some(rejection.message),
            },
            Err(e) => ClawbackResult {
                transfer_id: candidate.transfer_id.clone(),
                succeeded: false,
                request_id: None,
                error: Some(e.to_string()),
            },
        };

        self.ledger().mark_attempt(&result.transfer_id, result.succeeded);
        self.ledger().release(&result.transfer_id);
        if result.succeeded {
            info!(transfer_id = %result.transfer_id, "Clawback accepted");
        } else {
            warn!(transfer_id = %result.transfer_id, error = ?result.error, "Clawback failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, Scripted};

    fn transfer(id: &str) -> CompletedTransfer {
        CompletedTransfer {
            transfer_id: id.to_string(),
            asset: "tok".to_string(),
            amount: 10,
            custody_public_key: "02pool".to_string(),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_ledger_keeps_first_record_and_tracks_attempts() {
        let ledger = ClawbackLedger::new();
        let first = ClawbackCandidate::from_transfer(
            &transfer("t1"),
            IntentKind::ExecuteSwap,
            RecoveryStrategy::ClawbackRequired,
        );
        ledger.record(first.clone());
        ledger.record(ClawbackCandidate {
            strategy: RecoveryStrategy::AutoRefund,
            ..first
        });
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("t1").unwrap().strategy, RecoveryStrategy::ClawbackRequired);

        ledger.mark_attempt("t1", false);
        let entry = ledger.get("t1").unwrap();
        assert!(entry.attempted && !entry.succeeded);
        assert_eq!(ledger.pending().len(), 1);

        ledger.mark_attempt("t1", true);
        assert!(ledger.pending().is_empty());
    }

    #[tokio::test]
    async fn test_clawback_reports_per_transfer() {
        let h = harness();
        h.api.script(Scripted::accept(serde_json::json!({})));
        h.api.script(Scripted::reject("AMM-1008", None));

        let candidates: Vec<_> = ["t1", "t2"]
            .iter()
            .map(|id| {
                ClawbackCandidate::from_transfer(
                    &transfer(id),
                    IntentKind::AddLiquidity,
                    RecoveryStrategy::ClawbackRequired,
                )
            })
            .collect();

        let results = h.orchestrator.clawback(&candidates).await.unwrap();
        assert!(results[0].succeeded);
        assert!(!results[1].succeeded);
        assert!(h.orchestrator.ledger().get("t1").unwrap().succeeded);
        assert!(h.orchestrator.ledger().get("t2").unwrap().attempted);

        let submitted = h.api.submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].kind, IntentKind::Clawback);
        assert_eq!(submitted[0].body["transferId"], "t1");
        assert_eq!(submitted[0].body["custodyPublicKey"], "02pool");
        assert_ne!(submitted[0].body["nonce"], submitted[1].body["nonce"]);
    }

    #[tokio::test]
    async fn test_clawback_ignores_feature_flags_but_not_master_switch() {
        let h = harness();
        h.api.set_only_flags(&[]);
        let candidate = ClawbackCandidate::from_transfer(
            &transfer("t1"),
            IntentKind::ExecuteSwap,
            RecoveryStrategy::ClawbackRequired,
        );
        assert!(h.orchestrator.clawback(&[candidate.clone()]).await.is_ok());

        let h = harness();
        h.api.set_only_flags(&[(crate::policy::MASTER_KILL_SWITCH, true)]);
        assert!(h.orchestrator.clawback(&[candidate]).await.is_err());
        assert!(h.api.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_recover_stranded_skips_auto_refunds() {
        let h = harness();
        let ledger = h.orchestrator.ledger();
        ledger.record(ClawbackCandidate::from_transfer(
            &transfer("t1"),
            IntentKind::ExecuteSwap,
            RecoveryStrategy::ClawbackRecommended,
        ));
        ledger.record(ClawbackCandidate::from_transfer(
            &transfer("t2"),
            IntentKind::ExecuteSwap,
            RecoveryStrategy::AutoRefund,
        ));

        let results = h.orchestrator.recover_stranded().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].transfer_id, "t1");
        assert!(h.orchestrator.recover_stranded().await.unwrap().is_empty());
    }

    #[test]
    fn test_claim_is_exclusive_until_released() {
        let ledger = ClawbackLedger::new();
        assert!(ledger.claim("t1"));
        assert!(!ledger.claim("t1"));
        ledger.release("t1");
        assert!(ledger.claim("t1"));
    }

    #[tokio::test]
    async fn test_claimed_transfer_is_not_submitted_twice() {
        let h = harness();
        let candidate = ClawbackCandidate::from_transfer(
            &transfer("t1"),
            IntentKind::ExecuteSwap,
            RecoveryStrategy::ClawbackRequired,
        );
        assert!(h.orchestrator.ledger().claim("t1"));

        let results = h.orchestrator.clawback(&[candidate]).await.unwrap();
        assert!(!results[0].succeeded);
        assert!(h.api.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_recovery_claws_back_once() {
        let h = harness();
        h.orchestrator.ledger().record(ClawbackCandidate::from_transfer(
            &transfer("t1"),
            IntentKind::ExecuteSwap,
            RecoveryStrategy::ClawbackRequired,
        ));

        let (a, b) = tokio::join!(
            h.orchestrator.recover_stranded(),
            h.orchestrator.recover_stranded()
        );
        let succeeded = a
            .unwrap()
            .iter()
            .chain(b.unwrap().iter())
            .filter(|r| r.succeeded)
            .count();
        assert_eq!(succeeded, 1);
        assert_eq!(h.api.submitted().len(), 1);
        assert!(h.orchestrator.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_eligibility_uses_session_token() {
        let h = harness();
        h.api.set_eligibility("t1", true);
        let eligibility = h.orchestrator.check_clawback_eligibility("t1").await.unwrap();
        assert!(eligibility.eligible);
        assert!(!h.orchestrator.check_clawback_eligibility("t9").await.unwrap().eligible);
    }
}
