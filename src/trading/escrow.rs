//! Escrow lifecycle: create, fund, claim

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::orchestrator::{Orchestrator, TransferLeg};
use super::outcome::Settlement;
use crate::api::Escrow;
use crate::error::{Error, Result};
use crate::intent::schema::ESCROW_RECIPIENT_FIELDS;
use crate::intent::{FieldSet, Intent, IntentKind};
use crate::policy::AmountSide;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRecipient {
    pub public_key: String,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEscrowRequest {
    pub asset: String,
    pub recipients: Vec<EscrowRecipient>,
    pub expires_at: Option<DateTime<Utc>>,
    pub memo: Option<String>,
}

impl CreateEscrowRequest {
    /// Checked sum of recipient amounts
    pub fn total_amount(&self) -> Result<u128> {
        if self.recipients.is_empty() {
            return Err(Error::InvalidParameter("escrow needs at least one recipient".to_string()));
        }
        self.recipients.iter().try_fold(0u128, |total, r| {
            if r.amount == 0 {
                return Err(Error::InvalidParameter(format!(
                    "recipient {} has a zero amount",
                    r.public_key
                )));
            }
            total
                .checked_add(r.amount)
                .ok_or_else(|| Error::InvalidParameter("escrow total overflows".to_string()))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowCreated {
    pub escrow_id: String,
    #[serde(default)]
    pub custody_public_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub amount: Option<u128>,
}

impl Orchestrator {
    pub async fn get_escrow(&self, escrow_id: &str) -> Result<Escrow> {
        self.auth()
            .with_reauth(|token| async move { self.api().get_escrow(escrow_id, token.value()).await })
            .await
    }

    /// Register an escrow; no funds move until [`Orchestrator::fund_escrow`]
    pub async fn create_escrow(
        &self,
        request: &CreateEscrowRequest,
    ) -> Result<Settlement<EscrowCreated>> {
        let kind = IntentKind::CreateEscrow;
        self.policy().preflight(kind).await?;

        let total = request.total_amount()?;
        if let Some(expires_at) = request.expires_at {
            if expires_at <= Utc::now() {
                return Err(Error::InvalidParameter("escrow expiry is in the past".to_string()));
            }
        }
        self.policy()
            .assert_meets_min_amount(&request.asset, total, AmountSide::Input)
            .await?;

        let recipients = request
            .recipients
            .iter()
            .map(|r| {
                FieldSet::builder(ESCROW_RECIPIENT_FIELDS)
                    .field("recipientPublicKey", r.public_key.as_str())
                    .field("amount", r.amount)
                    .build()
            })
            .collect::<Result<Vec<_>>>()?;
        let expires_at = request
            .expires_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));
        let creator = self.user_public_key().to_string();

        self.settle(kind, Vec::new(), |nonce| {
            Intent::builder(kind)
                .field("creatorPublicKey", creator.as_str())
                .field("assetAddress", request.asset.as_str())
                .field("totalAmount", total)
                .field("recipients", recipients.clone())
                .optional("expiresAt", expires_at.as_deref())
                .optional("memo", request.memo.as_deref())
                .build(nonce)
        })
        .await
    }

    /// Transfer the escrow's full amount to its custody identity and confirm
    pub async fn fund_escrow(&self, escrow_id: &str) -> Result<Settlement<EscrowReceipt>> {
        let kind = IntentKind::FundEscrow;
        self.policy().preflight(kind).await?;

        let escrow = self.get_escrow(escrow_id).await?;
        if escrow.custody_public_key.is_empty() {
            return Err(Error::Protocol(format!(
                "escrow {} has no custody identity",
                escrow_id
            )));
        }
        self.policy()
            .assert_meets_min_amount(&escrow.asset_address, escrow.total_amount, AmountSide::Input)
            .await?;
        self.transfers()
            .ensure_balance(&[(escrow.asset_address.as_str(), escrow.total_amount)])
            .await?;
        self.ensure_authenticated().await?;

        let transfers = self
            .transfer_all(
                kind,
                &[TransferLeg {
                    asset: &escrow.asset_address,
                    amount: escrow.total_amount,
                    custody_public_key: &escrow.custody_public_key,
                }],
            )
            .await?;
        let transfer_id = transfers[0].transfer_id.clone();
        info!(escrow_id = %escrow_id, transfer_id = %transfer_id, "Escrow funding transferred");

        let funder = self.user_public_key().to_string();
        self.settle(kind, transfers, |nonce| {
            Intent::builder(kind)
                .field("funderPublicKey", funder.as_str())
                .field("escrowId", escrow.escrow_id.as_str())
                .field("assetAddress", escrow.asset_address.as_str())
                .field("amount", escrow.total_amount)
                .field("transferId", transfer_id.as_str())
                .build(nonce)
        })
        .await
    }

    pub async fn claim_escrow(&self, escrow_id: &str) -> Result<Settlement<EscrowReceipt>> {
        let kind = IntentKind::ClaimEscrow;
        self.policy().preflight(kind).await?;
        if escrow_id.is_empty() {
            return Err(Error::InvalidParameter("escrow id is empty".to_string()));
        }

        let claimant = self.user_public_key().to_string();
        self.settle(kind, Vec::new(), |nonce| {
            Intent::builder(kind)
                .field("claimantPublicKey", claimant.as_str())
                .field("escrowId", escrow_id)
                .build(nonce)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, Scripted, NATIVE};

    fn request() -> CreateEscrowRequest {
        CreateEscrowRequest {
            asset: NATIVE.to_string(),
            recipients: vec![
                EscrowRecipient {
                    public_key: "02alice".to_string(),
                    amount: 300,
                },
                EscrowRecipient {
                    public_key: "02bob".to_string(),
                    amount: 200,
                },
            ],
            expires_at: None,
            memo: Some("payroll".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_escrow_encodes_recipients() {
        let h = harness();
        h.api
            .script(Scripted::accept(serde_json::json!({"escrowId": "esc-9"})));

        let outcome = h.orchestrator.create_escrow(&request()).await.unwrap();
        assert_eq!(outcome.receipt().unwrap().escrow_id, "esc-9");

        let body = &h.api.submitted()[0].body;
        assert_eq!(body["totalAmount"], "500");
        assert_eq!(body["recipients"][1]["recipientPublicKey"], "02bob");
        assert_eq!(body["recipients"][1]["amount"], "200");
        assert_eq!(body["memo"], "payroll");
        assert!(body.get("expiresAt").is_none());
        assert!(h.wallet.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_create_escrow_rejects_bad_recipients() {
        let h = harness();
        let mut req = request();
        req.recipients[0].amount = 0;
        assert!(h.orchestrator.create_escrow(&req).await.is_err());
        req.recipients.clear();
        assert!(h.orchestrator.create_escrow(&req).await.is_err());
        assert!(h.api.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_fund_escrow_transfers_to_custody() {
        let h = harness();
        h.api.add_escrow(Escrow {
            escrow_id: "esc-1".to_string(),
            custody_public_key: "02escrowcustody".to_string(),
            creator_public_key: "02user".to_string(),
            asset_address: NATIVE.to_string(),
            total_amount: 750,
            status: None,
        });
        h.api.script(Scripted::accept(serde_json::json!({"status": "funded"})));

        let outcome = h.orchestrator.fund_escrow("esc-1").await.unwrap();
        assert_eq!(outcome.receipt().unwrap().status.as_deref(), Some("funded"));

        let transfers = h.wallet.transfers();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].recipient, "regtest1:02escrowcustody");
        assert_eq!(transfers[0].amount, 750);
        assert_eq!(h.api.submitted()[0].body["transferId"], "tx-1");
    }

    #[tokio::test]
    async fn test_unknown_escrow_moves_nothing() {
        let h = harness();
        assert!(h.orchestrator.fund_escrow("missing").await.is_err());
        assert!(h.wallet.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_escrow_flag_disabled() {
        let h = harness();
        h.api.set_only_flags(&[("allow_swaps", true)]);
        let err = h.orchestrator.claim_escrow("esc-1").await.unwrap_err();
        assert!(matches!(err, Error::FeatureDisabled { .. }));
    }
}
