//! Pool creation
//!
//! Creation is two-phase: the pool is registered first (no funds move),
//! then the initial deposit is transferred to the new pool's custody
//! identity and confirmed with a second signed intent.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::clawback::ClawbackCandidate;
use super::orchestrator::{Orchestrator, TransferLeg};
use super::outcome::Settlement;
use crate::amm::price::BPS_DENOMINATOR;
use crate::amm::{BondingCurveParams, BondingCurveReserves};
use crate::error::{Error, Result};
use crate::intent::{Intent, IntentKind};
use crate::policy::AmountSide;

/// Optional two-sided deposit made right after creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialDeposit {
    pub asset_a_amount: u128,
    pub asset_b_amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantProductPoolRequest {
    pub asset_a: String,
    pub asset_b: String,
    pub lp_fee_bps: u32,
    pub total_host_fee_bps: u32,
    pub host_namespace: Option<String>,
    pub initial_deposit: Option<InitialDeposit>,
}

/// Single-sided pool launched on a bonding curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSidedPoolRequest {
    pub asset_a: String,
    pub asset_b: String,
    pub curve: BondingCurveParams,
    pub lp_fee_bps: u32,
    pub total_host_fee_bps: u32,
    pub host_namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolCreated {
    pub pool_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositConfirmed {
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub lp_tokens: Option<u128>,
}

/// Initial deposit phase of a pool that was created
#[derive(Debug, Clone, PartialEq)]
pub enum DepositOutcome {
    /// Deposit transferred and the confirmation reached the service
    Settled(Settlement<DepositConfirmed>),
    /// A gate, transfer or submit failed; `stranded` is also in the ledger
    Failed {
        message: String,
        stranded: Vec<ClawbackCandidate>,
    },
}

impl DepositOutcome {
    pub fn settlement(&self) -> Option<&Settlement<DepositConfirmed>> {
        match self {
            DepositOutcome::Settled(settlement) => Some(settlement),
            DepositOutcome::Failed { .. } => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.settlement().map(Settlement::is_accepted).unwrap_or(false)
    }
}

/// Outcome of both creation phases
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCreation {
    pub creation: Settlement<PoolCreated>,
    /// `None` when no deposit was requested or creation was rejected
    pub deposit: Option<DepositOutcome>,
}

impl PoolCreation {
    pub fn pool_id(&self) -> Option<&str> {
        created_pool_id(&self.creation)
    }
}

fn created_pool_id(creation: &Settlement<PoolCreated>) -> Option<&str> {
    creation.receipt().map(|r| r.pool_id.as_str())
}

fn check_fees(lp_fee_bps: u32, total_host_fee_bps: u32) -> Result<()> {
    let total = lp_fee_bps as u128 + total_host_fee_bps as u128;
    if total >= BPS_DENOMINATOR {
        return Err(Error::InvalidParameter(format!(
            "pool fees {} bps must stay below 100%",
            total
        )));
    }
    Ok(())
}

impl Orchestrator {
    /// Register a constant-product pool, then deposit into it if requested
    pub async fn create_constant_product_pool(
        &self,
        request: &ConstantProductPoolRequest,
    ) -> Result<PoolCreation> {
        let kind = IntentKind::CreateConstantProductPool;
        self.policy().preflight(kind).await?;

        if request.asset_a == request.asset_b {
            return Err(Error::InvalidParameter("pool assets must differ".to_string()));
        }
        check_fees(request.lp_fee_bps, request.total_host_fee_bps)?;
        self.policy()
            .assert_asset_allowed_for_pool_creation(&request.asset_b)
            .await?;

        if let Some(deposit) = request.initial_deposit {
            if deposit.asset_a_amount == 0 || deposit.asset_b_amount == 0 {
                return Err(Error::InvalidParameter(
                    "initial deposit amounts must be positive".to_string(),
                ));
            }
            self.policy()
                .assert_meets_min_amount(&request.asset_a, deposit.asset_a_amount, AmountSide::Input)
                .await?;
            self.policy()
                .assert_meets_min_amount(&request.asset_b, deposit.asset_b_amount, AmountSide::Input)
                .await?;
            self.transfers()
                .ensure_balance(&[
                    (request.asset_a.as_str(), deposit.asset_a_amount),
                    (request.asset_b.as_str(), deposit.asset_b_amount),
                ])
                .await?;
        }
        self.ensure_authenticated().await?;

        let owner = self.user_public_key().to_string();
        let creation: Settlement<PoolCreated> = self
            .settle(kind, Vec::new(), |nonce| {
                Intent::builder(kind)
                    .field("poolOwnerPublicKey", owner.as_str())
                    .field("assetAAddress", request.asset_a.as_str())
                    .field("assetBAddress", request.asset_b.as_str())
                    .field("lpFeeRateBps", request.lp_fee_bps)
                    .field("totalHostFeeRateBps", request.total_host_fee_bps)
                    .optional("hostNamespace", request.host_namespace.as_deref())
                    .build(nonce)
            })
            .await?;

        let created = created_pool_id(&creation).map(str::to_string);
        let (Some(deposit), Some(pool_id)) = (request.initial_deposit, created) else {
            return Ok(PoolCreation {
                creation,
                deposit: None,
            });
        };
        info!(pool_id = %pool_id, "Constant-product pool created");

        let legs = [
            TransferLeg {
                asset: &request.asset_a,
                amount: deposit.asset_a_amount,
                custody_public_key: &pool_id,
            },
            TransferLeg {
                asset: &request.asset_b,
                amount: deposit.asset_b_amount,
                custody_public_key: &pool_id,
            },
        ];
        let confirmed = self.deposit_and_confirm(&pool_id, &legs).await;

        Ok(PoolCreation {
            creation,
            deposit: Some(confirmed),
        })
    }

    /// Register a bonding-curve pool and deposit its initial supply of asset A
    pub async fn create_single_sided_pool(
        &self,
        request: &SingleSidedPoolRequest,
    ) -> Result<PoolCreation> {
        let kind = IntentKind::CreateSingleSidedPool;
        self.policy().preflight(kind).await?;

        if request.asset_a == request.asset_b {
            return Err(Error::InvalidParameter("pool assets must differ".to_string()));
        }
        check_fees(request.lp_fee_bps, request.total_host_fee_bps)?;
        let reserves: BondingCurveReserves = request.curve.derive()?;
        let initial_supply = request.curve.initial_supply;

        self.policy()
            .assert_asset_allowed_for_pool_creation(&request.asset_b)
            .await?;
        self.policy()
            .assert_meets_min_amount(&request.asset_a, initial_supply, AmountSide::Input)
            .await?;
        self.transfers()
            .ensure_balance(&[(request.asset_a.as_str(), initial_supply)])
            .await?;
        self.ensure_authenticated().await?;

        let owner = self.user_public_key().to_string();
        let creation: Settlement<PoolCreated> = self
            .settle(kind, Vec::new(), |nonce| {
                Intent::builder(kind)
                    .field("poolOwnerPublicKey", owner.as_str())
                    .field("assetAAddress", request.asset_a.as_str())
                    .field("assetBAddress", request.asset_b.as_str())
                    .field("assetAInitialReserve", initial_supply)
                    .field("virtualReserveA", reserves.virtual_reserve_a)
                    .field("virtualReserveB", reserves.virtual_reserve_b)
                    .field("threshold", reserves.threshold)
                    .field("lpFeeRateBps", request.lp_fee_bps)
                    .field("totalHostFeeRateBps", request.total_host_fee_bps)
                    .optional("hostNamespace", request.host_namespace.as_deref())
                    .build(nonce)
            })
            .await?;

        let Some(pool_id) = created_pool_id(&creation).map(str::to_string) else {
            return Ok(PoolCreation {
                creation,
                deposit: None,
            });
        };
        info!(
            pool_id = %pool_id,
            virtual_reserve_a = %reserves.virtual_reserve_a,
            virtual_reserve_b = %reserves.virtual_reserve_b,
            threshold = %reserves.threshold,
            "Single-sided pool created"
        );

        let legs = [TransferLeg {
            asset: &request.asset_a,
            amount: initial_supply,
            custody_public_key: &pool_id,
        }];
        let confirmed = self.deposit_and_confirm(&pool_id, &legs).await;

        Ok(PoolCreation {
            creation,
            deposit: Some(confirmed),
        })
    }

    /// Deposit into a created pool; failures are reported, never raised, so
    /// the caller keeps the pool id
    async fn deposit_and_confirm(&self, pool_id: &str, legs: &[TransferLeg<'_>]) -> DepositOutcome {
        match self.try_deposit_and_confirm(pool_id, legs).await {
            Ok(settlement) => DepositOutcome::Settled(settlement),
            Err(e) => {
                let stranded = e.stranded_transfers().to_vec();
                warn!(
                    pool_id = %pool_id,
                    stranded = stranded.len(),
                    error = %e,
                    "Initial deposit did not settle"
                );
                DepositOutcome::Failed {
                    message: e.to_string(),
                    stranded,
                }
            }
        }
    }

    /// Transfer the initial deposit legs and confirm them against the new pool
    async fn try_deposit_and_confirm(
        &self,
        pool_id: &str,
        legs: &[TransferLeg<'_>],
    ) -> Result<Settlement<DepositConfirmed>> {
        let kind = IntentKind::ConfirmInitialDeposit;
        self.policy().preflight(kind).await?;
        let transfers = self.transfer_all(kind, legs).await?;
        let transfer_a = transfers[0].transfer_id.clone();
        let transfer_b = transfers.get(1).map(|t| t.transfer_id.clone());

        info!(pool_id = %pool_id, deposits = transfers.len(), "Initial deposit transferred");

        let owner = self.user_public_key().to_string();
        self.settle(kind, transfers, |nonce| {
            Intent::builder(kind)
                .field("poolOwnerPublicKey", owner.as_str())
                .field("poolId", pool_id)
                .field("assetATransferId", transfer_a.as_str())
                .optional("assetBTransferId", transfer_b.as_deref())
                .build(nonce)
        })
        .await
    }
}
