//! Host and integrator fee withdrawal

use serde::{Deserialize, Serialize};

use super::orchestrator::Orchestrator;
use super::outcome::Settlement;
use crate::error::{Error, Result};
use crate::intent::{Intent, IntentKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeWithdrawal {
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub asset_a_amount: Option<u128>,
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub asset_b_amount: Option<u128>,
}

impl Orchestrator {
    /// Withdraw accrued host fees; omitted amounts withdraw everything available
    pub async fn withdraw_host_fees(
        &self,
        pool_id: &str,
        asset_a_amount: Option<u128>,
        asset_b_amount: Option<u128>,
    ) -> Result<Settlement<FeeWithdrawal>> {
        let kind = IntentKind::WithdrawHostFees;
        self.policy().preflight(kind).await?;
        if asset_a_amount == Some(0) || asset_b_amount == Some(0) {
            return Err(Error::InvalidParameter(
                "fee withdrawal amounts must be positive when given".to_string(),
            ));
        }

        let host = self.user_public_key().to_string();
        self.settle(kind, Vec::new(), |nonce| {
            Intent::builder(kind)
                .field("hostPublicKey", host.as_str())
                .field("poolId", pool_id)
                .optional("assetAAmount", asset_a_amount)
                .optional("assetBAmount", asset_b_amount)
                .build(nonce)
        })
        .await
    }

    /// Integrator fees accrue in asset B only
    pub async fn withdraw_integrator_fees(
        &self,
        pool_id: &str,
        asset_b_amount: u128,
    ) -> Result<Settlement<FeeWithdrawal>> {
        let kind = IntentKind::WithdrawIntegratorFees;
        self.policy().preflight(kind).await?;
        if asset_b_amount == 0 {
            return Err(Error::InvalidParameter(
                "asset_b_amount must be positive".to_string(),
            ));
        }

        let integrator = self.user_public_key().to_string();
        self.settle(kind, Vec::new(), |nonce| {
            Intent::builder(kind)
                .field("integratorPublicKey", integrator.as_str())
                .field("poolId", pool_id)
                .field("assetBAmount", asset_b_amount)
                .build(nonce)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, Scripted};

    #[tokio::test]
    async fn test_host_withdrawal_omits_absent_amounts() {
        let h = harness();
        h.api
            .script(Scripted::accept(serde_json::json!({"assetBAmount": "42"})));

        let outcome = h
            .orchestrator
            .withdraw_host_fees("pool-1", None, Some(42))
            .await
            .unwrap();
        assert_eq!(outcome.receipt().unwrap().asset_b_amount, Some(42));

        let submitted = h.api.submitted();
        assert_eq!(submitted[0].kind, IntentKind::WithdrawHostFees);
        assert!(submitted[0].body.get("assetAAmount").is_none());
        assert_eq!(submitted[0].body["hostPublicKey"], "02user");
    }

    #[tokio::test]
    async fn test_integrator_withdrawal_rejection_has_no_candidates() {
        let h = harness();
        h.api.script(Scripted::reject("AMM-4005", None));

        let outcome = h
            .orchestrator
            .withdraw_integrator_fees("pool-1", 10)
            .await
            .unwrap();
        assert!(!outcome.rejection().unwrap().needs_clawback());
        assert!(h.orchestrator.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_zero_amount_refused_locally() {
        let h = harness();
        assert!(h.orchestrator.withdraw_integrator_fees("pool-1", 0).await.is_err());
        assert!(h.orchestrator.withdraw_host_fees("pool-1", Some(0), None).await.is_err());
        assert!(h.api.submitted().is_empty());
    }
}
