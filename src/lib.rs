//! AMM Gateway Client Library
//!
//! Client-side orchestration for an AMM settlement gateway: pool math,
//! signed intents, authentication, policy gates, and the transfer / sign /
//! submit pipeline with clawback accounting.

pub mod amm;
pub mod api;
pub mod auth;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod intent;
pub mod policy;
pub mod trading;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use trading::{Orchestrator, Settlement};
