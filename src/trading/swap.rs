//! Swaps and multi-hop route swaps

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::orchestrator::{Orchestrator, TransferLeg};
use super::outcome::Settlement;
use crate::amm::price::min_amount_out_with_slippage;
use crate::amm::{CurveType, Pool};
use crate::api::{RouteHopRequest, RouteSimulationRequest, SwapSimulationRequest};
use crate::error::{Error, Result};
use crate::intent::{FieldSet, Intent, IntentKind};
use crate::intent::schema::ROUTE_HOP_FIELDS;
use crate::policy::AmountSide;

/// Maximum hops accepted in one route
pub const MAX_ROUTE_HOPS: usize = 4;

/// Exact-input swap against one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub pool_id: String,
    pub asset_in: String,
    pub amount_in: u128,
    /// Explicit floor; derived from a quote and the slippage bound when absent
    pub min_amount_out: Option<u128>,
    pub max_slippage_bps: Option<u32>,
}

/// One hop of a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHop {
    pub pool_id: String,
    pub asset_in: String,
    pub asset_out: String,
    pub integrator_fee_bps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSwapRequest {
    pub hops: Vec<RouteHop>,
    pub amount_in: u128,
    pub min_amount_out: Option<u128>,
    pub max_route_slippage_bps: Option<u32>,
}

impl RouteSwapRequest {
    pub fn initial_asset(&self) -> Result<&str> {
        self.hops
            .first()
            .map(|h| h.asset_in.as_str())
            .ok_or_else(|| Error::InvalidParameter("route has no hops".to_string()))
    }

    pub fn final_asset(&self) -> Result<&str> {
        self.hops
            .last()
            .map(|h| h.asset_out.as_str())
            .ok_or_else(|| Error::InvalidParameter("route has no hops".to_string()))
    }

    /// Hop count bounds and asset continuity
    pub fn validate_shape(&self) -> Result<()> {
        if self.hops.is_empty() || self.hops.len() > MAX_ROUTE_HOPS {
            return Err(Error::InvalidParameter(format!(
                "route must have 1 to {} hops, got {}",
                MAX_ROUTE_HOPS,
                self.hops.len()
            )));
        }
        for (i, pair) in self.hops.windows(2).enumerate() {
            if pair[0].asset_out != pair[1].asset_in {
                return Err(Error::InvalidParameter(format!(
                    "hop {} outputs {} but hop {} expects {}",
                    i,
                    pair[0].asset_out,
                    i + 1,
                    pair[1].asset_in
                )));
            }
        }
        for hop in &self.hops {
            if hop.asset_in == hop.asset_out {
                return Err(Error::InvalidParameter(format!(
                    "hop through {} swaps an asset for itself",
                    hop.pool_id
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn hop_requests(&self) -> Vec<RouteHopRequest> {
        self.hops
            .iter()
            .map(|h| RouteHopRequest {
                pool_id: h.pool_id.clone(),
                asset_in_address: h.asset_in.clone(),
                asset_out_address: h.asset_out.clone(),
            })
            .collect()
    }
}

/// Receipt fields returned for an accepted swap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReceipt {
    #[serde(default, with = "crate::api::types::amount_opt")]
    pub amount_out: Option<u128>,
    #[serde(default)]
    pub output_transfer_id: Option<String>,
}

impl Orchestrator {
    /// Expected output for `amount_in`: locally for two-sided reserve curves,
    /// remotely for concentrated pools and pools still on a bonding curve
    async fn expected_swap_out(&self, pool: &Pool, asset_in: &str, amount_in: u128) -> Result<u128> {
        // Bonding pools price off virtual reserves the snapshot does not carry
        if pool.curve_type == CurveType::Concentrated || pool.is_bonding() {
            let request = SwapSimulationRequest {
                pool_id: pool.pool_id.clone(),
                asset_in_address: asset_in.to_string(),
                asset_out_address: pool.counter_asset(asset_in)?.to_string(),
                amount_in,
                integrator_fee_rate_bps: self.settings().integrator_fee_bps,
            };
            Ok(self.api().simulate_swap(&request).await?.amount_out)
        } else {
            pool.estimate_swap_out(asset_in, amount_in)
        }
    }

    /// Swap `amount_in` of `asset_in` through one pool
    pub async fn swap(&self, request: &SwapRequest) -> Result<Settlement<SwapReceipt>> {
        let kind = IntentKind::ExecuteSwap;
        self.policy().preflight(kind).await?;

        if request.amount_in == 0 {
            return Err(Error::InvalidParameter("amount_in must be positive".to_string()));
        }
        let slippage_bps = self.slippage_bps(request.max_slippage_bps)?;
        let pool = self.api().get_pool(&request.pool_id).await?;
        let asset_out = pool.counter_asset(&request.asset_in)?.to_string();

        let min_amount_out = match request.min_amount_out {
            Some(min) => min,
            None => {
                let expected = self
                    .expected_swap_out(&pool, &request.asset_in, request.amount_in)
                    .await?;
                min_amount_out_with_slippage(expected, slippage_bps)?
            }
        };
        debug!(pool_id = %pool.pool_id, min_amount_out, slippage_bps, "Swap bounds");

        self.policy()
            .assert_meets_min_amount(&request.asset_in, request.amount_in, AmountSide::Input)
            .await?;
        self.policy()
            .assert_meets_min_amount(&asset_out, min_amount_out, AmountSide::Output)
            .await?;
        self.transfers()
            .ensure_balance(&[(request.asset_in.as_str(), request.amount_in)])
            .await?;
        self.ensure_authenticated().await?;

        let transfers = self
            .transfer_all(
                kind,
                &[TransferLeg {
                    asset: &request.asset_in,
                    amount: request.amount_in,
                    custody_public_key: &pool.pool_id,
                }],
            )
            .await?;
        let transfer_id = transfers[0].transfer_id.clone();

        info!(
            pool_id = %pool.pool_id,
            transfer_id = %transfer_id,
            amount_in = request.amount_in,
            "Swap input transferred"
        );

        let user = self.user_public_key().to_string();
        let integrator = self.settings().integrator_public_key.clone();
        let integrator_fee = self.settings().integrator_fee_bps;

        self.settle(kind, transfers, |nonce| {
            Intent::builder(kind)
                .field("userPublicKey", user.as_str())
                .field("poolId", pool.pool_id.as_str())
                .field("assetInAddress", request.asset_in.as_str())
                .field("assetOutAddress", asset_out.as_str())
                .field("amountIn", request.amount_in)
                .field("minAmountOut", min_amount_out)
                .field("maxSlippageBps", slippage_bps)
                .field("assetInTransferId", transfer_id.as_str())
                .optional("integratorPublicKey", integrator.as_deref())
                .optional("integratorFeeRateBps", integrator_fee)
                .build(nonce)
        })
        .await
    }

    /// Swap along a multi-hop route; only the initial asset is transferred
    pub async fn route_swap(&self, request: &RouteSwapRequest) -> Result<Settlement<SwapReceipt>> {
        let kind = IntentKind::ExecuteRouteSwap;
        self.policy().preflight(kind).await?;

        request.validate_shape()?;
        if request.amount_in == 0 {
            return Err(Error::InvalidParameter("amount_in must be positive".to_string()));
        }
        let slippage_bps = self.slippage_bps(request.max_route_slippage_bps)?;
        let initial_asset = request.initial_asset()?.to_string();
        let final_asset = request.final_asset()?.to_string();

        for hop in &request.hops {
            let pool = self.api().get_pool(&hop.pool_id).await?;
            if !pool.contains(&hop.asset_in) || !pool.contains(&hop.asset_out) {
                return Err(Error::InvalidParameter(format!(
                    "pool {} does not trade {} for {}",
                    hop.pool_id, hop.asset_in, hop.asset_out
                )));
            }
        }

        let min_amount_out = match request.min_amount_out {
            Some(min) => min,
            None => {
                let simulation = self
                    .api()
                    .simulate_route_swap(&RouteSimulationRequest {
                        hops: request.hop_requests(),
                        initial_asset_address: initial_asset.clone(),
                        input_amount: request.amount_in,
                    })
                    .await?;
                min_amount_out_with_slippage(simulation.amount_out, slippage_bps)?
            }
        };

        self.policy()
            .assert_meets_min_amount(&initial_asset, request.amount_in, AmountSide::Input)
            .await?;
        self.policy()
            .assert_meets_min_amount(&final_asset, min_amount_out, AmountSide::Output)
            .await?;
        self.transfers()
            .ensure_balance(&[(initial_asset.as_str(), request.amount_in)])
            .await?;

        let hop_records = request
            .hops
            .iter()
            .map(|h| {
                FieldSet::builder(ROUTE_HOP_FIELDS)
                    .field("poolId", h.pool_id.as_str())
                    .field("assetInAddress", h.asset_in.as_str())
                    .field("assetOutAddress", h.asset_out.as_str())
                    .optional("hopIntegratorFeeRateBps", h.integrator_fee_bps)
                    .build()
            })
            .collect::<Result<Vec<_>>>()?;

        self.ensure_authenticated().await?;

        let first_pool = request.hops[0].pool_id.as_str();
        let transfers = self
            .transfer_all(
                kind,
                &[TransferLeg {
                    asset: &initial_asset,
                    amount: request.amount_in,
                    custody_public_key: first_pool,
                }],
            )
            .await?;
        let transfer_id = transfers[0].transfer_id.clone();

        info!(
            hops = request.hops.len(),
            transfer_id = %transfer_id,
            "Route swap input transferred"
        );

        let user = self.user_public_key().to_string();
        let integrator = self.settings().integrator_public_key.clone();
        let integrator_fee = self.settings().integrator_fee_bps;

        self.settle(kind, transfers, |nonce| {
            Intent::builder(kind)
                .field("userPublicKey", user.as_str())
                .field("hops", hop_records.clone())
                .field("initialAssetAddress", initial_asset.as_str())
                .field("inputAmount", request.amount_in)
                .field("minAmountOut", min_amount_out)
                .field("maxRouteSlippageBps", slippage_bps)
                .field("initialTransferId", transfer_id.as_str())
                .optional("integratorPublicKey", integrator.as_deref())
                .optional("integratorFeeRateBps", integrator_fee)
                .build(nonce)
        })
        .await
    }
}
