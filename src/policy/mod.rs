//! Live server policy: feature flags, minimum amounts, allow-lists, liveness

pub mod cache;
pub mod gates;

pub use cache::TtlCell;
pub use gates::{AmountSide, PolicyCache, PolicySettings, MASTER_KILL_SWITCH};
