//! Single-use nonces
//!
//! `Nonce` is deliberately not `Clone`: building an intent moves it, so one
//! nonce can end up in at most one signed intent.

use uuid::Uuid;

#[derive(Debug, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    /// Fresh random nonce (122 random bits)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_string(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
