//! Adding and removing liquidity

use serde::{Deserialize, Serialize};
use tracing::info;

use super::orchestrator::{Orchestrator, TransferLeg};
use super::outcome::Settlement;
use crate::amm::TickRange;
use crate::error::{Error, Result};
use crate::intent::{Intent, IntentKind};
use crate::policy::AmountSide;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityRequest {
    pub pool_id: String,
    pub asset_a_amount: u128,
    pub asset_b_amount: u128,
    /// Required for concentrated pools, rejected otherwise
    pub tick_range: Option<TickRange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityRequest {
    pub pool_id: String,
    pub lp_tokens_to_remove: u128,
    pub tick_range: Option<TickRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityReceipt {
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub lp_tokens: Option<u128>,
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub asset_a_amount: Option<u128>,
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub asset_b_amount: Option<u128>,
}

impl Orchestrator {
    /// Deposit both assets into a pool; A is sent before B
    pub async fn add_liquidity(
        &self,
        request: &AddLiquidityRequest,
    ) -> Result<Settlement<LiquidityReceipt>> {
        let kind = IntentKind::AddLiquidity;
        self.policy().preflight(kind).await?;

        if request.asset_a_amount == 0 || request.asset_b_amount == 0 {
            return Err(Error::InvalidParameter(
                "both liquidity amounts must be positive".to_string(),
            ));
        }
        let pool = self.api().get_pool(&request.pool_id).await?;
        pool.check_tick_range(request.tick_range.as_ref())?;

        self.policy()
            .assert_meets_min_amount(&pool.asset_a_address, request.asset_a_amount, AmountSide::Input)
            .await?;
        self.policy()
            .assert_meets_min_amount(&pool.asset_b_address, request.asset_b_amount, AmountSide::Input)
            .await?;
        self.transfers()
            .ensure_balance(&[
                (pool.asset_a_address.as_str(), request.asset_a_amount),
                (pool.asset_b_address.as_str(), request.asset_b_amount),
            ])
            .await?;
        self.ensure_authenticated().await?;

        let transfers = self
            .transfer_all(
                kind,
                &[
                    TransferLeg {
                        asset: &pool.asset_a_address,
                        amount: request.asset_a_amount,
                        custody_public_key: &pool.pool_id,
                    },
                    TransferLeg {
                        asset: &pool.asset_b_address,
                        amount: request.asset_b_amount,
                        custody_public_key: &pool.pool_id,
                    },
                ],
            )
            .await?;
        let transfer_a = transfers[0].transfer_id.clone();
        let transfer_b = transfers[1].transfer_id.clone();

        info!(
            pool_id = %pool.pool_id,
            transfer_a = %transfer_a,
            transfer_b = %transfer_b,
            "Liquidity transferred"
        );

        let user = self.user_public_key().to_string();
        let tick_lower = request.tick_range.map(|r| r.lower);
        let tick_upper = request.tick_range.map(|r| r.upper);

        self.settle(kind, transfers, |nonce| {
            Intent::builder(kind)
                .field("userPublicKey", user.as_str())
                .field("poolId", pool.pool_id.as_str())
                .field("assetATransferId", transfer_a.as_str())
                .field("assetBTransferId", transfer_b.as_str())
                .field("assetAAmount", request.asset_a_amount)
                .field("assetBAmount", request.asset_b_amount)
                .optional("tickLower", tick_lower)
                .optional("tickUpper", tick_upper)
                .build(nonce)
        })
        .await
    }

    /// Burn LP tokens; nothing is transferred by the client
    pub async fn remove_liquidity(
        &self,
        request: &RemoveLiquidityRequest,
    ) -> Result<Settlement<LiquidityReceipt>> {
        let kind = IntentKind::RemoveLiquidity;
        self.policy().preflight(kind).await?;

        if request.lp_tokens_to_remove == 0 {
            return Err(Error::InvalidParameter(
                "lp_tokens_to_remove must be positive".to_string(),
            ));
        }
        let pool = self.api().get_pool(&request.pool_id).await?;
        pool.check_tick_range(request.tick_range.as_ref())?;

        let user = self.user_public_key().to_string();
        let tick_lower = request.tick_range.map(|r| r.lower);
        let tick_upper = request.tick_range.map(|r| r.upper);

        self.settle(kind, Vec::new(), |nonce| {
            Intent::builder(kind)
                .field("userPublicKey", user.as_str())
                .field("poolId", pool.pool_id.as_str())
                .field("lpTokensToRemove", request.lp_tokens_to_remove)
                .optional("tickLower", tick_lower)
                .optional("tickUpper", tick_upper)
                .build(nonce)
        })
        .await
    }
}
