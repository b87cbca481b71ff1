//! Execution Engine Simulation.
//!
//! Walks the keeper lifecycle end to end: batch order execution with mixed
//! outcomes, one-cancels-other links, trailing stops and a liquidation pass.

use exec_core::*;
use rust_decimal_macros::dec;

const ADMIN: AccountId = AccountId(1);
const KEEPER: AccountId = AccountId(2);
const ALICE: AccountId = AccountId(10);
const BOB: AccountId = AccountId(11);

fn main() {
    println!("Execution Engine Simulation");
    println!("Keeper Batches, OCO, Trailing Stops, Liquidation\n");

    scenario_1_keeper_batch();
    scenario_2_oco_link();
    scenario_3_trailing_stop();
    scenario_4_liquidation();

    println!("\nAll simulations completed successfully.");
}

fn setup() -> InMemoryEngine {
    let mut oracle = OracleHub::new(Quote::new(dec!(1)), 3600);
    oracle.post_price(FeedId(1), Price::new_unchecked(dec!(2000)));
    oracle.set_published_at(Timestamp::from_secs(100));
    oracle.post_reference(FeedId(7), Price::new_unchecked(dec!(2000)), Timestamp::from_secs(100));

    let config = EngineConfig {
        admin: ADMIN,
        verbose: true,
        ..EngineConfig::default()
    };
    let mut engine = InMemoryEngine::in_memory(config, oracle);
    engine.set_time(Timestamp::from_secs(100));
    engine.set_keeper(ADMIN, KEEPER, true).unwrap();

    engine.markets_mut().add_market(MarketConfig::eth_perp()).unwrap();
    engine.markets_mut().add_asset(AssetConfig {
        id: AssetId(1),
        symbol: "ETH".to_string(),
        decimals: 0,
        min_size: dec!(0.01),
        reference_feed_id: FeedId(7),
    });

    engine
}

/// A mixed keeper batch: one fill, one pending skip, one expiry cancel.
fn scenario_1_keeper_batch() {
    println!("Scenario 1: Keeper Batch\n");

    let mut engine = setup();
    let created = Timestamp::from_secs(50);

    // raw 2000, 100 bps spread: a long fills at 2020
    engine.orders_mut().insert(Order::new_limit(
        OrderId(1), ALICE, AssetId(1), MarketId(1), Side::Long,
        dec!(10), Quote::new(dec!(1000)), Price::new_unchecked(dec!(2050)), created,
    ));
    // trigger 1900 is below the executable price: stays pending
    engine.orders_mut().insert(Order::new_limit(
        OrderId(2), BOB, AssetId(1), MarketId(1), Side::Long,
        dec!(5), Quote::new(dec!(500)), Price::new_unchecked(dec!(1900)), created,
    ));
    // already expired: cancelled
    engine.orders_mut().insert(
        Order::new_limit(
            OrderId(3), BOB, AssetId(1), MarketId(1), Side::Short,
            dec!(5), Quote::new(dec!(500)), Price::new_unchecked(dec!(2100)), created,
        )
        .with_expiry(Timestamp::from_secs(60)),
    );

    let report = engine
        .execute_orders(
            KEEPER,
            &[OrderId(1), OrderId(2), OrderId(3)],
            &[FeedId(1)],
            Quote::new(dec!(5)),
        )
        .unwrap();

    for (id, outcome) in &report.outcomes {
        println!("  order {:?}: {:?}", id, outcome);
    }
    println!("  executed: {}, refund: {}\n", report.executed_count(), report.refund);
}

/// Executing one leg of an OCO pair cancels the other.
fn scenario_2_oco_link() {
    println!("Scenario 2: One-Cancels-Other\n");

    let mut engine = setup();
    let created = Timestamp::from_secs(50);

    engine.positions_mut().seed(Position {
        owner: ALICE,
        asset: AssetId(1),
        market: MarketId(1),
        side: Side::Long,
        size: dec!(10),
        margin: Quote::new(dec!(1000)),
        entry_price: Price::new_unchecked(dec!(1950)),
        funding_index: dec!(0),
    });

    // take-profit fires at the current price; its stop-loss twin must go
    let take_profit = Order::new_limit(
        OrderId(1), ALICE, AssetId(1), MarketId(1), Side::Short,
        dec!(10), Quote::new(dec!(0)), Price::new_unchecked(dec!(1980)), created,
    )
    .with_cancel_order(OrderId(2))
    .as_reduce_only();
    let stop_loss = Order::new_stop(
        OrderId(2), ALICE, AssetId(1), MarketId(1), Side::Short,
        dec!(10), Quote::new(dec!(0)), Price::new_unchecked(dec!(1800)), created,
    )
    .with_cancel_order(OrderId(1))
    .as_reduce_only();
    engine.orders_mut().insert(take_profit);
    engine.orders_mut().insert(stop_loss);

    let report = engine
        .execute_orders(KEEPER, &[OrderId(1)], &[FeedId(1)], Quote::new(dec!(5)))
        .unwrap();

    println!("  take-profit: {:?}", report.outcomes[0].1);
    println!("  stop-loss still pending: {}", engine.orders().contains(OrderId(2)));
    for (id, reason, _) in engine.orders().cancellations() {
        println!("  cancelled {:?}: {}", id, reason);
    }
    println!();
}

/// A trailing stop fires once the price has run past its trail bound.
fn scenario_3_trailing_stop() {
    println!("Scenario 3: Trailing Stop\n");

    let mut engine = setup();

    engine.positions_mut().seed(Position {
        owner: ALICE,
        asset: AssetId(1),
        market: MarketId(1),
        side: Side::Short,
        size: dec!(10),
        margin: Quote::new(dec!(1000)),
        entry_price: Price::new_unchecked(dec!(2100)),
        funding_index: dec!(0),
    });
    engine.orders_mut().insert(Order::new_trailing_stop(
        OrderId(1), ALICE, AssetId(1), MarketId(1), Side::Long,
        dec!(10), Quote::new(dec!(0)), Bps::new(200), Timestamp::from_secs(50),
    ));

    // trail measured from 1950; a long closes the short once the ask runs
    // 200 bps above it
    let trail = TrailRef {
        price: Price::new_unchecked(dec!(1950)),
        published_at: Timestamp::from_secs(100),
    };

    let report = engine
        .execute_trailing_stop_orders(
            KEEPER,
            &[OrderId(1)],
            &[FeedId(1)],
            &[trail],
            Quote::new(dec!(5)),
        )
        .unwrap();

    println!("  trailing stop: {:?}", report.outcomes[0].1);
    println!();
}

/// A deep underwater long is force-closed.
fn scenario_4_liquidation() {
    println!("Scenario 4: Liquidation\n");

    let mut engine = setup();

    // long from 2700, price now ~2000: pnl well past half the margin
    engine.positions_mut().seed(Position {
        owner: BOB,
        asset: AssetId(1),
        market: MarketId(1),
        side: Side::Long,
        size: dec!(10),
        margin: Quote::new(dec!(10000)),
        entry_price: Price::new_unchecked(dec!(2700)),
        funding_index: dec!(0),
    });

    let target = LiquidationTarget {
        user: BOB,
        asset: AssetId(1),
        market: MarketId(1),
    };
    let report = engine
        .liquidate_positions(KEEPER, &[target], &[FeedId(1)], Quote::new(dec!(5)))
        .unwrap();

    match &report.outcomes[0].1 {
        LiquidationOutcome::Liquidated(record) => {
            println!("  liquidated {:?}: pnl {}, fee {}", record.user, record.pnl, record.fee);
        }
        LiquidationOutcome::Skipped(skip) => println!("  skipped: {}", skip),
    }
    println!(
        "  loss pool: {}",
        engine.markets().pool_balance(AssetId(1), MarketId(1))
    );
}
