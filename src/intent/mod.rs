//! Intents: declared schemas, canonical encoding, nonces and signing
//!
//! # WARNING: Wire contract
//! The remote verifier recomputes the canonical bytes independently.
//! Any change to field names, order or value rendering breaks every
//! signature without an obvious error.

pub mod codec;
pub mod nonce;
pub mod schema;
pub mod sign;

pub use codec::{FieldSet, FieldValue, Intent, IntentBuilder};
pub use nonce::Nonce;
pub use schema::IntentKind;
pub use sign::{sign_intent, SignedIntent};
