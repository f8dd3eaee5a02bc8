//! Trading module - settlement orchestration
//!
//! Every state-changing gateway operation is a method on [`Orchestrator`]:
//! - Swaps and multi-hop route swaps
//! - Liquidity add / remove
//! - Pool creation (constant-product and single-sided bonding curve)
//! - Escrow create / fund / claim
//! - Fee withdrawal
//! - Clawback of stranded transfers
//!
//! Read-only quotes live alongside in [`simulation`].

pub mod clawback;
pub mod escrow;
pub mod fees;
pub mod liquidity;
pub mod orchestrator;
pub mod outcome;
pub mod pools;
pub mod simulation;
pub mod swap;

pub use clawback::{ClawbackCandidate, ClawbackLedger, ClawbackResult};
pub use escrow::{CreateEscrowRequest, EscrowCreated, EscrowReceipt, EscrowRecipient};
pub use fees::FeeWithdrawal;
pub use liquidity::{AddLiquidityRequest, LiquidityReceipt, RemoveLiquidityRequest};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use outcome::{Accepted, Rejection, Settlement};
pub use pools::{
    ConstantProductPoolRequest, DepositConfirmed, DepositOutcome, InitialDeposit, PoolCreated,
    PoolCreation, SingleSidedPoolRequest,
};
pub use simulation::SwapQuote;
pub use swap::{RouteHop, RouteSwapRequest, SwapReceipt, SwapRequest, MAX_ROUTE_HOPS};
