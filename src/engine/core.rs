// 5.0: the engine itself. owns the keeper whitelist, the mutable parameters,
// the audit event buffer and the simulated clock. generic over its five
// collaborators so tests can swap any of them for an instrumented double.
//
// batch logic lives in orders.rs and liquidations.rs; this file is wiring,
// access control and the event machinery.

use crate::events::{Event, EventId, EventPayload};
use crate::funding::{FundingBook, FundingTracker};
use crate::market::{MarketRegistry, MarketStore};
use crate::oracle::{OracleClient, OracleHub};
use crate::order::{OrderStore, OrderVault};
use crate::position::{PositionBook, PositionStore};
use crate::types::{AccountId, Bps, Timestamp};
use std::collections::HashSet;

use super::config::EngineConfig;
use super::results::EngineError;

pub struct Engine<O, P, M, F, X> {
    pub(super) config: EngineConfig,
    pub(super) orders: O,
    pub(super) positions: P,
    pub(super) markets: M,
    pub(super) funding: F,
    pub(super) oracle: X,
    keepers: HashSet<AccountId>,
    pub(super) liquidation_fee: Bps,
    pub(super) reference_mandatory: bool,
    events: Vec<Event>,
    next_event_id: u64,
    current_time: Timestamp,
    in_call: bool,
}

/// Engine over the in-memory reference collaborators. What the simulator and
/// most integration tests use.
pub type InMemoryEngine = Engine<OrderVault, PositionBook, MarketRegistry, FundingBook, OracleHub>;

impl<O, P, M, F, X> Engine<O, P, M, F, X>
where
    O: OrderStore,
    P: PositionStore,
    M: MarketStore,
    F: FundingTracker,
    X: OracleClient,
{
    pub fn new(config: EngineConfig, orders: O, positions: P, markets: M, funding: F, oracle: X) -> Self {
        let liquidation_fee = config.liquidation_fee;
        let reference_mandatory = config.reference_mandatory;
        Self {
            config,
            orders,
            positions,
            markets,
            funding,
            oracle,
            keepers: HashSet::new(),
            liquidation_fee,
            reference_mandatory,
            events: Vec::new(),
            next_event_id: 0,
            current_time: Timestamp::from_secs(0),
            in_call: false,
        }
    }

    // --- clock ---

    pub fn set_time(&mut self, now: Timestamp) {
        self.current_time = now;
    }

    pub fn advance_time(&mut self, secs: i64) {
        self.current_time = Timestamp::from_secs(self.current_time.as_secs() + secs);
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    // --- keepers and admin ---

    pub fn is_keeper(&self, account: AccountId) -> bool {
        self.keepers.contains(&account)
    }

    pub(super) fn require_keeper(&self, account: AccountId) -> Result<(), EngineError> {
        if self.is_keeper(account) {
            Ok(())
        } else {
            Err(EngineError::NotKeeper)
        }
    }

    fn require_admin(&self, account: AccountId) -> Result<(), EngineError> {
        if account == self.config.admin {
            Ok(())
        } else {
            Err(EngineError::Unauthorized)
        }
    }

    pub fn set_keeper(
        &mut self,
        caller: AccountId,
        keeper: AccountId,
        allowed: bool,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        if allowed {
            self.keepers.insert(keeper);
        } else {
            self.keepers.remove(&keeper);
        }
        self.emit_event(EventPayload::KeeperUpdated { keeper, allowed });
        Ok(())
    }

    pub fn set_liquidation_fee(&mut self, caller: AccountId, fee: Bps) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        if fee.value() > 10_000 {
            return Err(EngineError::FeeOutOfRange(fee.value()));
        }
        self.liquidation_fee = fee;
        self.emit_event(EventPayload::LiquidationFeeUpdated { fee });
        Ok(())
    }

    pub fn set_reference_mandatory(
        &mut self,
        caller: AccountId,
        mandatory: bool,
    ) -> Result<(), EngineError> {
        self.require_admin(caller)?;
        self.reference_mandatory = mandatory;
        self.emit_event(EventPayload::ReferenceMandatoryUpdated { mandatory });
        Ok(())
    }

    pub fn liquidation_fee(&self) -> Bps {
        self.liquidation_fee
    }

    pub fn reference_mandatory(&self) -> bool {
        self.reference_mandatory
    }

    // --- collaborator access ---

    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn orders_mut(&mut self) -> &mut O {
        &mut self.orders
    }

    pub fn positions(&self) -> &P {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut P {
        &mut self.positions
    }

    pub fn markets(&self) -> &M {
        &self.markets
    }

    pub fn markets_mut(&mut self) -> &mut M {
        &mut self.markets
    }

    pub fn funding(&self) -> &F {
        &self.funding
    }

    pub fn oracle_mut(&mut self) -> &mut X {
        &mut self.oracle
    }

    // --- events ---

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event {
            id: EventId(self.next_event_id),
            timestamp: self.current_time,
            payload,
        };
        self.next_event_id += 1;

        if self.config.verbose {
            println!(
                "[{}] event {} {}: {:?}",
                event.timestamp.as_secs(),
                event.id.0,
                event.payload.kind(),
                event.payload
            );
        }

        while self.events.len() >= self.config.max_events.max(1) {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    // --- reentrancy guard ---

    pub(super) fn begin_call(&mut self) -> Result<(), EngineError> {
        if self.in_call {
            return Err(EngineError::ReenteredCall);
        }
        self.in_call = true;
        Ok(())
    }

    pub(super) fn end_call(&mut self) {
        self.in_call = false;
    }
}

impl InMemoryEngine {
    /// Build an engine wired to fresh in-memory collaborators.
    pub fn in_memory(config: EngineConfig, oracle: OracleHub) -> Self {
        Engine::new(
            config,
            OrderVault::new(),
            PositionBook::new(),
            MarketRegistry::new(),
            FundingBook::new(),
            oracle,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleHub;
    use crate::types::Quote;
    use rust_decimal_macros::dec;

    fn engine() -> InMemoryEngine {
        let config = EngineConfig {
            admin: AccountId(1),
            ..EngineConfig::default()
        };
        InMemoryEngine::in_memory(config, OracleHub::new(Quote::new(dec!(1)), 3600))
    }

    #[test]
    fn keeper_whitelist_is_admin_gated() {
        let mut engine = engine();

        let err = engine.set_keeper(AccountId(2), AccountId(9), true).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));
        assert!(!engine.is_keeper(AccountId(9)));

        engine.set_keeper(AccountId(1), AccountId(9), true).unwrap();
        assert!(engine.is_keeper(AccountId(9)));

        engine.set_keeper(AccountId(1), AccountId(9), false).unwrap();
        assert!(!engine.is_keeper(AccountId(9)));
    }

    #[test]
    fn liquidation_fee_bounds() {
        let mut engine = engine();

        engine.set_liquidation_fee(AccountId(1), Bps::new(10_000)).unwrap();
        assert_eq!(engine.liquidation_fee().value(), 10_000);

        let err = engine
            .set_liquidation_fee(AccountId(1), Bps::new(10_001))
            .unwrap_err();
        assert!(matches!(err, EngineError::FeeOutOfRange(10_001)));
    }

    #[test]
    fn reentrancy_guard_blocks_nested_calls() {
        let mut engine = engine();

        engine.begin_call().unwrap();
        assert!(matches!(engine.begin_call(), Err(EngineError::ReenteredCall)));
        engine.end_call();
        engine.begin_call().unwrap();
    }

    #[test]
    fn event_buffer_is_bounded() {
        let config = EngineConfig {
            admin: AccountId(1),
            max_events: 2,
            ..EngineConfig::default()
        };
        let mut engine =
            InMemoryEngine::in_memory(config, OracleHub::new(Quote::new(dec!(1)), 3600));

        for allowed in [true, false, true] {
            engine.set_keeper(AccountId(1), AccountId(9), allowed).unwrap();
        }

        assert_eq!(engine.events().len(), 2);
        // oldest event dropped, ids keep counting
        assert_eq!(engine.events()[0].id.0, 1);
        assert_eq!(engine.recent_events(1)[0].id.0, 2);
    }
}
