//! Intent signing
//!
//! The signer sees only the 32-byte digest of the canonical encoding.

use tracing::debug;

use super::codec::Intent;
use super::schema::IntentKind;
use crate::error::{Error, Result};
use crate::wallet::RawSigner;

/// An intent bound to exactly one signature
#[derive(Debug)]
pub struct SignedIntent {
    intent: Intent,
    canonical: String,
    digest: [u8; 32],
    signature: Vec<u8>,
}

impl SignedIntent {
    pub fn kind(&self) -> IntentKind {
        self.intent.kind()
    }

    pub fn nonce(&self) -> &str {
        self.intent.nonce()
    }

    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub fn signature_hex(&self) -> String {
        hex::encode(&self.signature)
    }

    /// JSON request body: the canonical object with `signature` appended
    pub fn request_body(&self) -> Result<String> {
        let prefix = self
            .canonical
            .strip_suffix('}')
            .ok_or_else(|| Error::Internal("canonical encoding is not an object".to_string()))?;
        Ok(format!(
            "{},\"signature\":{}}}",
            prefix,
            serde_json::to_string(&self.signature_hex())?
        ))
    }
}

/// Encode, hash and sign an intent
pub async fn sign_intent(intent: Intent, signer: &dyn RawSigner) -> Result<SignedIntent> {
    let canonical = intent.canonical_string()?;
    let digest = super::codec::digest(canonical.as_bytes());

    debug!(
        kind = %intent.kind(),
        nonce = %intent.nonce(),
        digest = %hex::encode(digest),
        "Signing intent"
    );

    let signature = signer.sign_raw_message(&digest).await?;
    if signature.is_empty() {
        return Err(Error::Signing("signer returned an empty signature".to_string()));
    }

    Ok(SignedIntent {
        intent,
        canonical,
        digest,
        signature,
    })
}
