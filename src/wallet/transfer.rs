//! Transfer execution
//!
//! Moves funds to a pool or escrow custody identity through the wallet
//! collaborator. Native and token transfers take different wallet calls;
//! both recipients and token ids go through the address codec first.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::codec::AddressCodec;
use super::types::{CompletedTransfer, Network, WalletBalance, NATIVE_ASSET_ADDRESS};
use super::Wallet;
use crate::error::{Error, Result};

/// Transfer executor for custody deposits
pub struct TransferExecutor {
    wallet: Arc<dyn Wallet>,
    codec: Arc<dyn AddressCodec>,
    network: Network,
}

impl TransferExecutor {
    pub fn new(wallet: Arc<dyn Wallet>, codec: Arc<dyn AddressCodec>, network: Network) -> Self {
        Self {
            wallet,
            codec,
            network,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Available balance of an asset address
    pub fn available(&self, balance: &WalletBalance, asset: &str) -> Result<u128> {
        if asset == NATIVE_ASSET_ADDRESS {
            Ok(balance.native_balance)
        } else {
            let token_id = self.codec.encode(asset, self.network)?;
            Ok(balance.token(&token_id))
        }
    }

    /// Fail unless every (asset, amount) requirement is covered, summing repeats
    pub async fn ensure_balance(&self, requirements: &[(&str, u128)]) -> Result<()> {
        let mut totals: BTreeMap<&str, u128> = BTreeMap::new();
        for (asset, amount) in requirements {
            let entry = totals.entry(asset).or_insert(0);
            *entry = entry.checked_add(*amount).ok_or_else(|| {
                Error::InvalidParameter(format!("required amount of {} overflows", asset))
            })?;
        }

        let balance = self.wallet.get_balance().await?;
        for (asset, required) in totals {
            let available = self.available(&balance, asset)?;
            debug!(asset = %asset, available, required, "Balance check");
            if available < required {
                return Err(Error::InsufficientBalance {
                    asset: asset.to_string(),
                    available,
                    required,
                });
            }
        }
        Ok(())
    }

    /// Send `amount` of `asset` to a custody identity
    pub async fn send(
        &self,
        asset: &str,
        amount: u128,
        custody_public_key: &str,
    ) -> Result<CompletedTransfer> {
        if amount == 0 {
            return Err(Error::InvalidParameter("transfer amount must be positive".to_string()));
        }
        let recipient = self.codec.encode(custody_public_key, self.network)?;

        let transfer_id = if asset == NATIVE_ASSET_ADDRESS {
            self.wallet.transfer(amount, &recipient).await?
        } else {
            let token_id = self.codec.encode(asset, self.network)?;
            self.wallet.transfer_token(&token_id, amount, &recipient).await?
        };

        if transfer_id.is_empty() {
            return Err(Error::Wallet("wallet returned an empty transfer id".to_string()));
        }

        info!(
            transfer_id = %transfer_id,
            asset = %asset,
            amount,
            custody = %custody_public_key,
            "Transfer complete"
        );

        Ok(CompletedTransfer {
            transfer_id,
            asset: asset.to_string(),
            amount,
            custody_public_key: custody_public_key.to_string(),
            completed_at: Utc::now(),
        })
    }
}
