//! Core types shared with the wallet collaborator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Address of the native asset in pool and intent fields
pub const NATIVE_ASSET_ADDRESS: &str =
    "020202020202020202020202020202020202020202020202020202020202020202";

/// Ledger network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
    Local,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Signet => write!(f, "signet"),
            Network::Regtest => write!(f, "regtest"),
            Network::Local => write!(f, "local"),
        }
    }
}

/// Wallet balances in smallest units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletBalance {
    pub native_balance: u128,
    /// Keyed by human-readable token identifier
    pub token_balances: HashMap<String, u128>,
}

impl WalletBalance {
    pub fn token(&self, token_id: &str) -> u128 {
        self.token_balances.get(token_id).copied().unwrap_or(0)
    }
}

/// Public identity of the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletIdentity {
    pub public_key: String,
    pub address: String,
}

/// A transfer that has irrevocably reached a custody identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTransfer {
    /// Opaque id returned by the wallet
    pub transfer_id: String,
    /// Asset address (pool/intent form)
    pub asset: String,
    #[serde(with = "crate::api::types::amount")]
    pub amount: u128,
    /// Custody identity public key the funds reached
    pub custody_public_key: String,
    pub completed_at: DateTime<Utc>,
}
