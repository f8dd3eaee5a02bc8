//! Read-only quotes
//!
//! Quotes run the operation's policy gate and ask the remote simulate
//! endpoints; nothing is signed or transferred.

use serde::Serialize;
use tracing::debug;

use super::liquidity::{AddLiquidityRequest, RemoveLiquidityRequest};
use super::orchestrator::Orchestrator;
use super::swap::{RouteSwapRequest, SwapRequest};
use crate::amm::price::min_amount_out_with_slippage;
use crate::api::{
    AddLiquiditySimulation, AddLiquiditySimulationRequest, RemoveLiquiditySimulation,
    RemoveLiquiditySimulationRequest, RouteSimulationRequest, SwapSimulationRequest,
};
use crate::error::{Error, Result};
use crate::intent::IntentKind;

/// Simulated swap output plus the floor the orchestrator would sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub amount_out: u128,
    pub min_amount_out: u128,
    pub slippage_bps: u32,
    pub price_impact_bps: Option<u32>,
    pub execution_price: Option<String>,
}

impl Orchestrator {
    pub async fn quote_swap(&self, request: &SwapRequest) -> Result<SwapQuote> {
        self.policy()
            .ensure_operation_allowed(IntentKind::ExecuteSwap)
            .await?;
        if request.amount_in == 0 {
            return Err(Error::InvalidParameter("amount_in must be positive".to_string()));
        }
        let slippage_bps = self.slippage_bps(request.max_slippage_bps)?;
        let pool = self.api().get_pool(&request.pool_id).await?;

        let simulation = self
            .api()
            .simulate_swap(&SwapSimulationRequest {
                pool_id: pool.pool_id.clone(),
                asset_in_address: request.asset_in.clone(),
                asset_out_address: pool.counter_asset(&request.asset_in)?.to_string(),
                amount_in: request.amount_in,
                integrator_fee_rate_bps: self.settings().integrator_fee_bps,
            })
            .await?;
        debug!(pool_id = %pool.pool_id, amount_out = simulation.amount_out, "Swap quoted");

        Ok(SwapQuote {
            amount_out: simulation.amount_out,
            min_amount_out: min_amount_out_with_slippage(simulation.amount_out, slippage_bps)?,
            slippage_bps,
            price_impact_bps: simulation.price_impact_bps,
            execution_price: simulation.execution_price,
        })
    }

    pub async fn quote_route_swap(&self, request: &RouteSwapRequest) -> Result<SwapQuote> {
        self.policy()
            .ensure_operation_allowed(IntentKind::ExecuteRouteSwap)
            .await?;
        request.validate_shape()?;
        if request.amount_in == 0 {
            return Err(Error::InvalidParameter("amount_in must be positive".to_string()));
        }
        let slippage_bps = self.slippage_bps(request.max_route_slippage_bps)?;

        let simulation = self
            .api()
            .simulate_route_swap(&RouteSimulationRequest {
                hops: request.hop_requests(),
                initial_asset_address: request.initial_asset()?.to_string(),
                input_amount: request.amount_in,
            })
            .await?;

        Ok(SwapQuote {
            amount_out: simulation.amount_out,
            min_amount_out: min_amount_out_with_slippage(simulation.amount_out, slippage_bps)?,
            slippage_bps,
            price_impact_bps: simulation.price_impact_bps,
            execution_price: None,
        })
    }

    pub async fn quote_add_liquidity(
        &self,
        request: &AddLiquidityRequest,
    ) -> Result<AddLiquiditySimulation> {
        self.policy()
            .ensure_operation_allowed(IntentKind::AddLiquidity)
            .await?;
        let pool = self.api().get_pool(&request.pool_id).await?;
        pool.check_tick_range(request.tick_range.as_ref())?;

        self.api()
            .simulate_add_liquidity(&AddLiquiditySimulationRequest {
                pool_id: pool.pool_id.clone(),
                asset_a_amount: request.asset_a_amount,
                asset_b_amount: request.asset_b_amount,
                tick_lower: request.tick_range.map(|r| r.lower),
                tick_upper: request.tick_range.map(|r| r.upper),
            })
            .await
    }

    pub async fn quote_remove_liquidity(
        &self,
        request: &RemoveLiquidityRequest,
    ) -> Result<RemoveLiquiditySimulation> {
        self.policy()
            .ensure_operation_allowed(IntentKind::RemoveLiquidity)
            .await?;
        let pool = self.api().get_pool(&request.pool_id).await?;
        pool.check_tick_range(request.tick_range.as_ref())?;

        self.api()
            .simulate_remove_liquidity(&RemoveLiquiditySimulationRequest {
                pool_id: pool.pool_id.clone(),
                lp_tokens_to_remove: request.lp_tokens_to_remove,
                tick_lower: request.tick_range.map(|r| r.lower),
                tick_upper: request.tick_range.map(|r| r.upper),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::pool::test_pool;
    use crate::amm::CurveType;
    use crate::testing::{harness, NATIVE};

    #[tokio::test]
    async fn test_quote_swap_applies_slippage() {
        let h = harness();
        h.api.add_pool(test_pool(CurveType::ConstantProduct));
        h.api.set_swap_simulation(10_000);

        let quote = h
            .orchestrator
            .quote_swap(&SwapRequest {
                pool_id: "pool-custody-key".to_string(),
                asset_in: NATIVE.to_string(),
                amount_in: 500,
                min_amount_out: None,
                max_slippage_bps: Some(250),
            })
            .await
            .unwrap();
        assert_eq!(quote.amount_out, 10_000);
        assert_eq!(quote.min_amount_out, 9_750);
        assert!(h.api.submitted().is_empty());
        assert!(h.wallet.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_quotes_respect_feature_flags() {
        let h = harness();
        h.api.add_pool(test_pool(CurveType::ConstantProduct));
        h.api.set_only_flags(&[("allow_swaps", true)]);

        let err = h
            .orchestrator
            .quote_remove_liquidity(&RemoveLiquidityRequest {
                pool_id: "pool-custody-key".to_string(),
                lp_tokens_to_remove: 5,
                tick_range: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FeatureDisabled { .. }));
    }

    #[tokio::test]
    async fn test_quote_add_liquidity() {
        let h = harness();
        h.api.add_pool(test_pool(CurveType::ConstantProduct));

        let sim = h
            .orchestrator
            .quote_add_liquidity(&AddLiquidityRequest {
                pool_id: "pool-custody-key".to_string(),
                asset_a_amount: 100,
                asset_b_amount: 7,
                tick_range: None,
            })
            .await
            .unwrap();
        assert_eq!(sim.asset_a_used, 100);
        assert_eq!(sim.asset_b_used, 7);
    }
}
