//! Remote settlement service
//!
//! [`SettlementApi`] is the seam the orchestrator, auth session and policy
//! cache talk through. [`HttpClient`] is the reqwest implementation.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::amm::Pool;
use crate::error::Result;
use crate::intent::SignedIntent;

pub use http::HttpClient;
pub use types::{
    AddLiquiditySimulation, AddLiquiditySimulationRequest, AllowedAssets, AuthChallenge,
    AuthGrant, ClawbackEligibility, ErrorBody, Escrow, FeatureFlags, MinAmounts, PingOutcome,
    RefundDetails, RemoveLiquiditySimulation, RemoveLiquiditySimulationRequest, RouteHopRequest,
    RouteSimulation, RouteSimulationRequest, SettlementResponse, SwapSimulation,
    SwapSimulationRequest,
};

/// Settlement REST API, one method per endpoint group
#[async_trait]
pub trait SettlementApi: Send + Sync {
    // Auth
    async fn auth_challenge(&self, public_key: &str) -> Result<AuthChallenge>;

    async fn auth_verify(
        &self,
        public_key: &str,
        signature_hex: &str,
        session_id: Option<&str>,
    ) -> Result<AuthGrant>;

    // Reads
    async fn get_pool(&self, pool_id: &str) -> Result<Pool>;

    async fn list_pools(&self) -> Result<Vec<Pool>>;

    async fn get_escrow(&self, escrow_id: &str, token: &str) -> Result<Escrow>;

    async fn check_clawback_eligibility(
        &self,
        transfer_id: &str,
        token: &str,
    ) -> Result<ClawbackEligibility>;

    // Simulations
    async fn simulate_swap(&self, request: &SwapSimulationRequest) -> Result<SwapSimulation>;

    async fn simulate_route_swap(&self, request: &RouteSimulationRequest)
        -> Result<RouteSimulation>;

    async fn simulate_add_liquidity(
        &self,
        request: &AddLiquiditySimulationRequest,
    ) -> Result<AddLiquiditySimulation>;

    async fn simulate_remove_liquidity(
        &self,
        request: &RemoveLiquiditySimulationRequest,
    ) -> Result<RemoveLiquiditySimulation>;

    /// Submit a signed intent to its endpoint. Never retried.
    async fn submit(&self, intent: &SignedIntent, token: &str) -> Result<SettlementResponse>;

    // Policy
    async fn feature_status(&self) -> Result<FeatureFlags>;

    async fn min_amounts(&self) -> Result<MinAmounts>;

    async fn allowed_assets(&self) -> Result<AllowedAssets>;

    async fn ping(&self) -> Result<()>;
}
