//! Address / token identifier codec interface
//!
//! The bech32-style codec itself lives outside this crate.

use super::types::Network;
use crate::error::Result;

/// Decoded human-readable identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedId {
    pub raw_id: String,
    pub network: Network,
}

/// Network-prefixed encoding of raw identity keys and token ids
pub trait AddressCodec: Send + Sync {
    fn encode(&self, raw_id: &str, network: Network) -> Result<String>;

    fn decode(&self, human_readable_id: &str, network: Network) -> Result<DecodedId>;
}
