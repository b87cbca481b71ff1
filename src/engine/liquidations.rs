// 5.2: the liquidation batch. same one-draw-per-call shape as order
// execution, but stricter about price quality: a liquidation never settles
// on a price outside the reference band, where order execution would merely
// wait for the next batch.
//
// settlement order is load-bearing. funding must be brought current while
// the position still counts toward open interest, so the tracker update
// strictly precedes the OI decrement.

use crate::events::EventPayload;
use crate::funding::FundingTracker;
use crate::liquidation::{
    breaches_margin, liquidation_fee, LiquidationOutcome, LiquidationRecord, LiquidationSkip,
};
use crate::market::MarketStore;
use crate::oracle::{OracleClient, PriceBatch};
use crate::order::OrderStore;
use crate::position::PositionStore;
use crate::pricing::{resolve_price, within_reference_bounds};
use crate::types::{FeedId, Price, Quote, Side};

use super::core::Engine;
use super::results::{EngineError, LiquidationReport, LiquidationTarget};

impl<O, P, M, F, X> Engine<O, P, M, F, X>
where
    O: OrderStore,
    P: PositionStore,
    M: MarketStore,
    F: FundingTracker,
    X: OracleClient,
{
    /// Keeper entry point: liquidate a batch of positions against one fresh
    /// price draw.
    pub fn liquidate_positions(
        &mut self,
        keeper: crate::types::AccountId,
        targets: &[LiquidationTarget],
        feeds: &[FeedId],
        fee_prepaid: Quote,
    ) -> Result<LiquidationReport, EngineError> {
        self.begin_call()?;
        let result = self.liquidate_positions_inner(keeper, targets, feeds, fee_prepaid);
        self.end_call();
        result
    }

    fn liquidate_positions_inner(
        &mut self,
        keeper: crate::types::AccountId,
        targets: &[LiquidationTarget],
        feeds: &[FeedId],
        fee_prepaid: Quote,
    ) -> Result<LiquidationReport, EngineError> {
        self.require_keeper(keeper)?;

        let draw = self.oracle.get_prices(feeds, fee_prepaid)?;

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = self.run_liquidation(*target, &draw.batch);
            outcomes.push((*target, outcome));
        }

        Ok(LiquidationReport {
            outcomes,
            refund: draw.refund,
        })
    }

    fn run_liquidation(
        &mut self,
        target: LiquidationTarget,
        batch: &PriceBatch,
    ) -> LiquidationOutcome {
        // the missing-position reason outranks any config lookup failure
        let Some(position) = self
            .positions
            .get_position(target.user, target.asset, target.market)
        else {
            return self.skip(target, LiquidationSkip::NoPosition);
        };

        let market = match self.markets.get_market(target.market) {
            Ok(market) => market,
            Err(e) => return self.skip(target, LiquidationSkip::Collaborator(e.to_string())),
        };
        let asset = match self.markets.get_asset(target.asset) {
            Ok(asset) => asset,
            Err(e) => return self.skip(target, LiquidationSkip::Collaborator(e.to_string())),
        };

        // a forced close fills on the worse side for the trader: longs close
        // at the bid, shorts at the ask
        let price = resolve_price(
            batch,
            market.feed_id,
            market.spread,
            position.side == Side::Short,
        );

        if batch.age(self.time()) > market.max_price_age {
            return self.skip(target, LiquidationSkip::Stale);
        }
        if price.is_zero() {
            return self.skip(target, LiquidationSkip::NoPrice);
        }

        let reference_price = self
            .oracle
            .get_reference_price(asset.reference_feed_id, self.time())
            .unwrap_or_else(|_| Price::zero());
        let reference_mandatory = self.reference_mandatory || market.reference_required;
        if !within_reference_bounds(
            market.max_reference_deviation,
            reference_price,
            price,
            reference_mandatory,
        ) {
            return self.skip(target, LiquidationSkip::ReferenceDeviation);
        }

        let breakdown = match self.positions.get_pnl(
            position.asset,
            position.market,
            position.side,
            price,
            position.entry_price,
            position.size,
            position.funding_index,
        ) {
            Ok(breakdown) => breakdown,
            Err(e) => return self.skip(target, LiquidationSkip::Collaborator(e.to_string())),
        };

        if !breaches_margin(breakdown.pnl, position.margin, market.liquidation_threshold) {
            // healthy position, not an error: no event
            return LiquidationOutcome::Skipped(LiquidationSkip::NotLiquidatable);
        }

        let fee = liquidation_fee(position.size, market.trading_fee, self.liquidation_fee);

        // settlement sequence; any step failing leaves the remainder undone
        // and reports the collaborator's reason
        if let Err(e) = self.markets.credit_trader_loss(
            target.user,
            target.asset,
            target.market,
            position.margin.sub(fee),
        ) {
            return self.skip(target, LiquidationSkip::Collaborator(e.to_string()));
        }
        if let Err(e) =
            self.positions
                .credit_fee(target.user, target.asset, target.market, fee, true)
        {
            return self.skip(target, LiquidationSkip::Collaborator(e.to_string()));
        }
        if let Err(e) = self.funding.update_funding_tracker(target.asset, target.market) {
            return self.skip(target, LiquidationSkip::Collaborator(e.to_string()));
        }
        if let Err(e) = self.positions.decrement_open_interest(
            target.asset,
            target.market,
            position.size,
            position.side,
        ) {
            return self.skip(target, LiquidationSkip::Collaborator(e.to_string()));
        }
        if let Err(e) = self
            .positions
            .remove(target.user, target.asset, target.market)
        {
            return self.skip(target, LiquidationSkip::Collaborator(e.to_string()));
        }

        // event enrichment only: a zero reference yields a zero USD value
        // rather than blocking a settlement that already happened
        let margin_usd = if reference_price.is_zero() {
            Quote::zero()
        } else {
            Quote::new(position.margin.value() * reference_price.value() / asset.unit_scale())
        };

        let record = LiquidationRecord {
            user: target.user,
            asset: target.asset,
            market: target.market,
            side: position.side,
            size: position.size,
            margin: position.margin,
            margin_usd,
            price,
            fee,
            pnl: breakdown.pnl,
            funding_fee: breakdown.funding_fee,
        };

        self.emit_event(EventPayload::Liquidated {
            user: record.user,
            asset: record.asset,
            market: record.market,
            side: record.side,
            size: record.size,
            margin: record.margin,
            margin_usd: record.margin_usd,
            price: record.price,
            fee: record.fee,
            pnl: record.pnl,
            funding_fee: record.funding_fee,
        });

        LiquidationOutcome::Liquidated(record)
    }

    fn skip(&mut self, target: LiquidationTarget, skip: LiquidationSkip) -> LiquidationOutcome {
        self.emit_event(EventPayload::LiquidationError {
            user: target.user,
            asset: target.asset,
            market: target.market,
            reason: skip.to_string(),
        });
        LiquidationOutcome::Skipped(skip)
    }
}
