//! Engine configuration.

use crate::types::{AccountId, Bps};

/// Static parameters fixed at construction. The mutable counterparts
/// (liquidation fee, reference mandate, keeper set) live on the engine and
/// are adjusted through admin calls.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Account allowed to change keepers and engine parameters.
    pub admin: AccountId,
    /// Initial extra fee charged on liquidation, on top of the market's
    /// trading fee.
    pub liquidation_fee: Bps,
    /// Initial global reference-price mandate. Individual markets can also
    /// require a reference via their own flag.
    pub reference_mandatory: bool,
    /// Ring-buffer capacity for audit events; oldest events are dropped.
    pub max_events: usize,
    /// Print events to stdout as they are emitted.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin: AccountId(0),
            liquidation_fee: Bps::new(40),
            reference_mandatory: false,
            max_events: 100_000,
            verbose: false,
        }
    }
}
