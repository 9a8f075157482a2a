//! Per-connection policy session state.

pub mod manager;

pub use manager::{PolicySessionManager, TurnStats};
