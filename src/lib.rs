// exec-core: keeper-driven execution and liquidation engine for a leveraged
// perpetual venue. the engine owns no balances and no order submission; it
// reads pending orders and open positions from collaborator stores, resolves
// prices from a metered oracle draw, and commits executions, cancellations
// and forced closes back through those stores. all computation is
// deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, AssetId, Side, Price, Quote, Bps
//   2.x  oracle.rs: metered batch price draw + reference price contract
//   2.1  pricing.rs: spread-adjusted price resolution, reference bounding
//   3.x  eligibility.rs: per-order trigger state machine, skip/cancel split
//   3.1  order.rs: pending orders, order store contract, TTLs
//   4.x  position.rs: positions, pnl, position store contract
//   4.1  market.rs: market/asset config, loss pool
//   4.2  funding.rs: funding tracker contract
//   4.3  liquidation.rs: margin breach test, fee math, outcome types
//   5.x  engine/: batch orchestration, keepers, admin, audit events
//   6.x  events.rs: audit event payloads

// core decision modules
pub mod eligibility;
pub mod liquidation;
pub mod order;
pub mod position;
pub mod pricing;
pub mod types;

// collaborator contracts and reference stores
pub mod funding;
pub mod market;
pub mod oracle;

// orchestration
pub mod engine;
pub mod events;

// re exports for convenience
pub use eligibility::*;
pub use engine::*;
pub use events::*;
pub use funding::*;
pub use liquidation::*;
pub use market::*;
pub use oracle::*;
pub use order::*;
pub use position::*;
pub use pricing::*;
pub use types::*;
