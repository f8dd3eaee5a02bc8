//! Wallet collaborator interfaces
//!
//! The custody/signing wallet, the signer abstraction and the address codec
//! are external collaborators; this module defines what the orchestrator
//! needs from them and the transfer executor that drives deposits.
//!
//! # Architecture
//!
//! ```text
//! Wallet ──► WalletSigner ─┐
//!                          ├─► RawSigner ──► intent signing / auth challenge
//! custom signer ───────────┘
//! Wallet + AddressCodec ──► TransferExecutor ──► custody deposits
//! ```

pub mod codec;
pub mod signer;
pub mod transfer;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use codec::{AddressCodec, DecodedId};
pub use signer::{RawSigner, SignerSource, WalletSigner};
pub use transfer::TransferExecutor;
pub use types::{
    CompletedTransfer, Network, WalletBalance, WalletIdentity, NATIVE_ASSET_ADDRESS,
};

/// Custody wallet: balances, irrevocable transfers and raw signing
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn get_balance(&self) -> Result<WalletBalance>;

    /// Send native funds; returns the transfer id
    async fn transfer(&self, amount: u128, recipient_address: &str) -> Result<String>;

    /// Send a token; returns the transfer id
    async fn transfer_token(
        &self,
        token_id: &str,
        amount: u128,
        recipient_address: &str,
    ) -> Result<String>;

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Vec<u8>>;

    async fn identity(&self) -> Result<WalletIdentity>;
}
