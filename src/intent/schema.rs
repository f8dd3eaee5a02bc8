//! Declared field lists for every signable operation
//!
//! The remote verifier rebuilds the canonical encoding from the same lists,
//! so order and names here are part of the wire contract. Never reorder.

use serde::{Deserialize, Serialize};

/// Whether a field must be present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// One declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub presence: Presence,
}

const fn req(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        presence: Presence::Required,
    }
}

const fn opt(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        presence: Presence::Optional,
    }
}

/// Name of the nonce key, always encoded last
pub const NONCE_FIELD: &str = "nonce";

/// Every state-changing operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ExecuteSwap,
    ExecuteRouteSwap,
    AddLiquidity,
    RemoveLiquidity,
    CreateConstantProductPool,
    CreateSingleSidedPool,
    ConfirmInitialDeposit,
    CreateEscrow,
    FundEscrow,
    ClaimEscrow,
    WithdrawHostFees,
    WithdrawIntegratorFees,
    Clawback,
}

pub const SWAP_FIELDS: &[FieldSpec] = &[
    req("userPublicKey"),
    req("poolId"),
    req("assetInAddress"),
    req("assetOutAddress"),
    req("amountIn"),
    req("minAmountOut"),
    req("maxSlippageBps"),
    req("assetInTransferId"),
    opt("integratorPublicKey"),
    opt("integratorFeeRateBps"),
];

pub const ROUTE_SWAP_FIELDS: &[FieldSpec] = &[
    req("userPublicKey"),
    req("hops"),
    req("initialAssetAddress"),
    req("inputAmount"),
    req("minAmountOut"),
    req("maxRouteSlippageBps"),
    req("initialTransferId"),
    opt("integratorPublicKey"),
    opt("integratorFeeRateBps"),
];

/// Fields of one route hop record
pub const ROUTE_HOP_FIELDS: &[FieldSpec] = &[
    req("poolId"),
    req("assetInAddress"),
    req("assetOutAddress"),
    opt("hopIntegratorFeeRateBps"),
];

pub const ADD_LIQUIDITY_FIELDS: &[FieldSpec] = &[
    req("userPublicKey"),
    req("poolId"),
    req("assetATransferId"),
    req("assetBTransferId"),
    req("assetAAmount"),
    req("assetBAmount"),
    opt("tickLower"),
    opt("tickUpper"),
];

pub const REMOVE_LIQUIDITY_FIELDS: &[FieldSpec] = &[
    req("userPublicKey"),
    req("poolId"),
    req("lpTokensToRemove"),
    opt("tickLower"),
    opt("tickUpper"),
];

pub const CREATE_CONSTANT_PRODUCT_POOL_FIELDS: &[FieldSpec] = &[
    req("poolOwnerPublicKey"),
    req("assetAAddress"),
    req("assetBAddress"),
    req("lpFeeRateBps"),
    req("totalHostFeeRateBps"),
    opt("hostNamespace"),
];

pub const CREATE_SINGLE_SIDED_POOL_FIELDS: &[FieldSpec] = &[
    req("poolOwnerPublicKey"),
    req("assetAAddress"),
    req("assetBAddress"),
    req("assetAInitialReserve"),
    req("virtualReserveA"),
    req("virtualReserveB"),
    req("threshold"),
    req("lpFeeRateBps"),
    req("totalHostFeeRateBps"),
    opt("hostNamespace"),
];

pub const CONFIRM_INITIAL_DEPOSIT_FIELDS: &[FieldSpec] = &[
    req("poolOwnerPublicKey"),
    req("poolId"),
    req("assetATransferId"),
    opt("assetBTransferId"),
];

pub const CREATE_ESCROW_FIELDS: &[FieldSpec] = &[
    req("creatorPublicKey"),
    req("assetAddress"),
    req("totalAmount"),
    req("recipients"),
    opt("expiresAt"),
    opt("memo"),
];

/// Fields of one escrow recipient record
pub const ESCROW_RECIPIENT_FIELDS: &[FieldSpec] = &[req("recipientPublicKey"), req("amount")];

pub const FUND_ESCROW_FIELDS: &[FieldSpec] = &[
    req("funderPublicKey"),
    req("escrowId"),
    req("assetAddress"),
    req("amount"),
    req("transferId"),
];

pub const CLAIM_ESCROW_FIELDS: &[FieldSpec] = &[req("claimantPublicKey"), req("escrowId")];

pub const WITHDRAW_HOST_FEES_FIELDS: &[FieldSpec] = &[
    req("hostPublicKey"),
    req("poolId"),
    opt("assetAAmount"),
    opt("assetBAmount"),
];

pub const WITHDRAW_INTEGRATOR_FEES_FIELDS: &[FieldSpec] = &[
    req("integratorPublicKey"),
    req("poolId"),
    req("assetBAmount"),
];

pub const CLAWBACK_FIELDS: &[FieldSpec] = &[
    req("senderPublicKey"),
    req("transferId"),
    req("custodyPublicKey"),
];

impl IntentKind {
    /// Declared field list, in encoding order
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            IntentKind::ExecuteSwap => SWAP_FIELDS,
            IntentKind::ExecuteRouteSwap => ROUTE_SWAP_FIELDS,
            IntentKind::AddLiquidity => ADD_LIQUIDITY_FIELDS,
            IntentKind::RemoveLiquidity => REMOVE_LIQUIDITY_FIELDS,
            IntentKind::CreateConstantProductPool => CREATE_CONSTANT_PRODUCT_POOL_FIELDS,
            IntentKind::CreateSingleSidedPool => CREATE_SINGLE_SIDED_POOL_FIELDS,
            IntentKind::ConfirmInitialDeposit => CONFIRM_INITIAL_DEPOSIT_FIELDS,
            IntentKind::CreateEscrow => CREATE_ESCROW_FIELDS,
            IntentKind::FundEscrow => FUND_ESCROW_FIELDS,
            IntentKind::ClaimEscrow => CLAIM_ESCROW_FIELDS,
            IntentKind::WithdrawHostFees => WITHDRAW_HOST_FEES_FIELDS,
            IntentKind::WithdrawIntegratorFees => WITHDRAW_INTEGRATOR_FEES_FIELDS,
            IntentKind::Clawback => CLAWBACK_FIELDS,
        }
    }

    /// Settlement endpoint path, relative to the API base
    pub fn endpoint(&self) -> &'static str {
        match self {
            IntentKind::ExecuteSwap => "swap/execute",
            IntentKind::ExecuteRouteSwap => "route-swap/execute",
            IntentKind::AddLiquidity => "liquidity/add",
            IntentKind::RemoveLiquidity => "liquidity/remove",
            IntentKind::CreateConstantProductPool => "pools/create-constant-product",
            IntentKind::CreateSingleSidedPool => "pools/create-single-sided",
            IntentKind::ConfirmInitialDeposit => "pools/confirm-initial-deposit",
            IntentKind::CreateEscrow => "escrow/create",
            IntentKind::FundEscrow => "escrow/fund",
            IntentKind::ClaimEscrow => "escrow/claim",
            IntentKind::WithdrawHostFees => "fees/host/withdraw",
            IntentKind::WithdrawIntegratorFees => "fees/integrator/withdraw",
            IntentKind::Clawback => "clawback/execute",
        }
    }

    /// Feature flag gating this operation; `None` means only the master switch applies
    pub fn feature_flag(&self) -> Option<&'static str> {
        match self {
            IntentKind::ExecuteSwap => Some("allow_swaps"),
            IntentKind::ExecuteRouteSwap => Some("allow_route_swaps"),
            IntentKind::AddLiquidity => Some("allow_add_liquidity"),
            IntentKind::RemoveLiquidity => Some("allow_withdraw_liquidity"),
            IntentKind::CreateConstantProductPool
            | IntentKind::CreateSingleSidedPool
            | IntentKind::ConfirmInitialDeposit => Some("allow_pool_creation"),
            IntentKind::CreateEscrow | IntentKind::FundEscrow | IntentKind::ClaimEscrow => {
                Some("allow_escrow")
            }
            IntentKind::WithdrawHostFees | IntentKind::WithdrawIntegratorFees => {
                Some("allow_withdraw_fees")
            }
            // Gated by the master switch only
            IntentKind::Clawback => None,
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IntentKind::ExecuteSwap => "execute_swap",
            IntentKind::ExecuteRouteSwap => "execute_route_swap",
            IntentKind::AddLiquidity => "add_liquidity",
            IntentKind::RemoveLiquidity => "remove_liquidity",
            IntentKind::CreateConstantProductPool => "create_constant_product_pool",
            IntentKind::CreateSingleSidedPool => "create_single_sided_pool",
            IntentKind::ConfirmInitialDeposit => "confirm_initial_deposit",
            IntentKind::CreateEscrow => "create_escrow",
            IntentKind::FundEscrow => "fund_escrow",
            IntentKind::ClaimEscrow => "claim_escrow",
            IntentKind::WithdrawHostFees => "withdraw_host_fees",
            IntentKind::WithdrawIntegratorFees => "withdraw_integrator_fees",
            IntentKind::Clawback => "clawback",
        };
        write!(f, "{}", name)
    }
}
