//! The keeper-facing engine: batch order execution, liquidation, admin
//! controls and the audit event buffer.

mod config;
mod core;
mod liquidations;
mod orders;
mod results;

pub use config::EngineConfig;
pub use core::{Engine, InMemoryEngine};
pub use results::{BatchReport, EngineError, LiquidationReport, LiquidationTarget};
