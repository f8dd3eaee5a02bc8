//! Raw-message signers
//!
//! One narrow trait covers both providers: the wallet collaborator and any
//! caller-supplied signer. The provider is picked explicitly through
//! [`SignerSource`] when the client is built.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::Wallet;
use crate::error::{Error, Result};

/// Signs raw bytes on behalf of one identity
#[async_trait]
pub trait RawSigner: Send + Sync {
    /// Hex public key of the signing identity
    fn public_key(&self) -> &str;

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Adapter that signs through the wallet collaborator
pub struct WalletSigner {
    wallet: Arc<dyn Wallet>,
    public_key: String,
}

impl WalletSigner {
    /// Resolve the wallet identity once and bind to it
    pub async fn connect(wallet: Arc<dyn Wallet>) -> Result<Self> {
        let identity = wallet.identity().await?;
        if identity.public_key.is_empty() {
            return Err(Error::Wallet("wallet reported an empty public key".to_string()));
        }
        Ok(Self {
            wallet,
            public_key: identity.public_key,
        })
    }
}

#[async_trait]
impl RawSigner for WalletSigner {
    fn public_key(&self) -> &str {
        &self.public_key
    }

    async fn sign_raw_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.wallet.sign_raw_message(message).await
    }
}

/// Which signer the client uses
pub enum SignerSource {
    /// Sign with the wallet collaborator's own key
    Wallet,
    /// Sign with a separately supplied signer
    Custom(Arc<dyn RawSigner>),
}

impl SignerSource {
    pub async fn resolve(self, wallet: &Arc<dyn Wallet>) -> Result<Arc<dyn RawSigner>> {
        match self {
            SignerSource::Wallet => {
                let signer = WalletSigner::connect(wallet.clone()).await?;
                info!(public_key = %signer.public_key(), "Using wallet signer");
                Ok(Arc::new(signer))
            }
            SignerSource::Custom(signer) => {
                info!(public_key = %signer.public_key(), "Using custom signer");
                Ok(signer)
            }
        }
    }
}
