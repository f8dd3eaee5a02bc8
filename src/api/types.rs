//! Wire types for the settlement REST API
//!
//! Amounts travel as decimal strings so values above 2^53 survive JSON
//! parsers on the other side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::classifier::{self, ErrorCategory};

/// Serde helper: `u128` as a decimal string, accepting plain numbers on input
pub mod amount {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s
                .parse::<u128>()
                .map_err(|e| de::Error::custom(format!("invalid amount '{}': {}", s, e))),
            Raw::Number(n) => Ok(n as u128),
        }
    }
}

/// Serde helper: optional `u128` carried like [`amount`]
pub mod amount_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    struct Wrapped(#[serde(with = "super::amount")] u128);

    pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::amount::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u128>, D::Error> {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
    }
}

/// Structured error body returned by every endpoint on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: String,
    #[serde(default)]
    pub error_category: Option<String>,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
}

impl ErrorBody {
    /// Category declared by the server, if it parses
    pub fn declared_category(&self) -> Option<ErrorCategory> {
        self.error_category
            .as_deref()
            .and_then(|c| c.parse::<ErrorCategory>().ok())
    }

    /// Whether this error asks the client to authenticate again
    pub fn requires_reauth(&self) -> bool {
        classifier::is_auth_code(&self.error_code)
    }
}

/// Transfers the service refunded on rejection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundDetails {
    #[serde(default)]
    pub refunded_transfer_ids: Vec<String>,
    #[serde(default)]
    pub refund_transfer_ids: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RefundDetails {
    pub fn covers(&self, transfer_id: &str) -> bool {
        self.refunded_transfer_ids.iter().any(|id| id == transfer_id)
    }
}

/// Response of any state-changing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub accepted: bool,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub refund: Option<RefundDetails>,
    /// Operation-specific result fields
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl SettlementResponse {
    pub fn accepted(payload: serde_json::Value) -> Self {
        Self {
            accepted: true,
            request_id: None,
            message: None,
            error: None,
            refund: None,
            payload: match payload {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
        }
    }

    pub fn rejected(error: ErrorBody, refund: Option<RefundDetails>) -> Self {
        Self {
            accepted: false,
            request_id: error.request_id.clone(),
            message: Some(error.message.clone()),
            error: Some(error),
            refund,
            payload: serde_json::Map::new(),
        }
    }

    /// Rejected because the bearer token is no longer valid
    pub fn requires_reauth(&self) -> bool {
        !self.accepted && self.error.as_ref().map(|e| e.requires_reauth()).unwrap_or(false)
    }
}

// Auth

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest<'a> {
    pub public_key: &'a str,
}

/// Challenge issued by the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    /// Message to sign, as UTF-8 text
    pub challenge: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest<'a> {
    pub public_key: &'a str,
    pub signature: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// Bearer credential granted for a verified challenge
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

// Config / policy

/// Feature flags keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlags(pub HashMap<String, bool>);

impl FeatureFlags {
    /// Absent flags read as disabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinAmountEntry {
    pub asset_address: String,
    #[serde(with = "amount")]
    pub min_amount: u128,
}

/// Minimum amounts by asset address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinAmounts(pub HashMap<String, u128>);

impl MinAmounts {
    pub fn from_entries(entries: Vec<MinAmountEntry>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|e| (e.asset_address, e.min_amount))
                .collect(),
        )
    }

    pub fn get(&self, asset: &str) -> Option<u128> {
        self.0.get(asset).copied()
    }
}

/// Asset-B addresses accepted for new pools; empty means any
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedAssets(pub Vec<String>);

impl AllowedAssets {
    pub fn allows(&self, asset: &str) -> bool {
        self.0.is_empty() || self.0.iter().any(|a| a == asset)
    }
}

/// Result of the last liveness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingOutcome {
    pub live: bool,
    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}

// Simulations

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSimulationRequest {
    pub pool_id: String,
    pub asset_in_address: String,
    pub asset_out_address: String,
    #[serde(with = "amount")]
    pub amount_in: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrator_fee_rate_bps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSimulation {
    #[serde(with = "amount")]
    pub amount_out: u128,
    #[serde(default)]
    pub price_impact_bps: Option<u32>,
    #[serde(default)]
    pub execution_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHopRequest {
    pub pool_id: String,
    pub asset_in_address: String,
    pub asset_out_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSimulationRequest {
    pub hops: Vec<RouteHopRequest>,
    pub initial_asset_address: String,
    #[serde(with = "amount")]
    pub input_amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSimulation {
    #[serde(with = "amount")]
    pub amount_out: u128,
    #[serde(default)]
    pub price_impact_bps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquiditySimulationRequest {
    pub pool_id: String,
    #[serde(with = "amount")]
    pub asset_a_amount: u128,
    #[serde(with = "amount")]
    pub asset_b_amount: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_lower: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_upper: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquiditySimulation {
    #[serde(with = "amount")]
    pub lp_tokens_minted: u128,
    #[serde(with = "amount")]
    pub asset_a_used: u128,
    #[serde(with = "amount")]
    pub asset_b_used: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquiditySimulationRequest {
    pub pool_id: String,
    #[serde(with = "amount")]
    pub lp_tokens_to_remove: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_lower: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_upper: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquiditySimulation {
    #[serde(with = "amount")]
    pub asset_a_amount: u128,
    #[serde(with = "amount")]
    pub asset_b_amount: u128,
}

// Escrow / clawback

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escrow {
    pub escrow_id: String,
    /// Custody identity that receives funding transfers
    pub custody_public_key: String,
    pub creator_public_key: String,
    pub asset_address: String,
    #[serde(with = "amount")]
    pub total_amount: u128,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClawbackEligibilityRequest<'a> {
    pub transfer_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClawbackEligibility {
    pub eligible: bool,
    #[serde(default)]
    pub reason: Option<String>,
}
