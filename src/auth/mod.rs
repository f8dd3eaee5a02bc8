//! Authentication with the settlement service

pub mod session;

pub use session::{AuthSession, AuthState, AuthToken};
