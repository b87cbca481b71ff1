// 5.1: the order execution batch. one oracle draw per call, then every order
// is processed independently: a failed or skipped order never poisons its
// neighbours. cancellations and audit events commit immediately per item.

use crate::eligibility::{
    evaluate_trigger, CancelReason, Outcome, TrailRef, TriggerContext, TriggerDecision,
};
use crate::events::EventPayload;
use crate::funding::FundingTracker;
use crate::market::MarketStore;
use crate::oracle::{OracleClient, PriceBatch};
use crate::order::{OrderStore, OrderType};
use crate::position::PositionStore;
use crate::pricing::resolve_price;
use crate::types::{AccountId, FeedId, OrderId, Price, Quote, Side};

use super::core::Engine;
use super::results::{BatchReport, EngineError};

impl<O, P, M, F, X> Engine<O, P, M, F, X>
where
    O: OrderStore,
    P: PositionStore,
    M: MarketStore,
    F: FundingTracker,
    X: OracleClient,
{
    /// Keeper entry point: execute a batch of pending orders against one
    /// fresh price draw.
    pub fn execute_orders(
        &mut self,
        keeper: AccountId,
        order_ids: &[OrderId],
        feeds: &[FeedId],
        fee_prepaid: Quote,
    ) -> Result<BatchReport, EngineError> {
        self.begin_call()?;
        let result = self.execute_orders_inner(keeper, order_ids, feeds, &[], fee_prepaid);
        self.end_call();
        result
    }

    /// Keeper entry point for trailing stops. `trail_refs` supplies, per
    /// order, the moving reference price the trail is measured from.
    pub fn execute_trailing_stop_orders(
        &mut self,
        keeper: AccountId,
        order_ids: &[OrderId],
        feeds: &[FeedId],
        trail_refs: &[TrailRef],
        fee_prepaid: Quote,
    ) -> Result<BatchReport, EngineError> {
        if order_ids.len() != trail_refs.len() {
            return Err(EngineError::TrailRefMismatch {
                expected: order_ids.len(),
                got: trail_refs.len(),
            });
        }
        self.begin_call()?;
        let result = self.execute_orders_inner(keeper, order_ids, feeds, trail_refs, fee_prepaid);
        self.end_call();
        result
    }

    fn execute_orders_inner(
        &mut self,
        keeper: AccountId,
        order_ids: &[OrderId],
        feeds: &[FeedId],
        trail_refs: &[TrailRef],
        fee_prepaid: Quote,
    ) -> Result<BatchReport, EngineError> {
        self.require_keeper(keeper)?;
        if self.orders.is_processing_paused() {
            return Err(EngineError::ProcessingPaused);
        }

        // one draw per call; the refund is paid out once for the whole batch
        let draw = self.oracle.get_prices(feeds, fee_prepaid)?;

        let mut outcomes = Vec::with_capacity(order_ids.len());
        for (index, id) in order_ids.iter().enumerate() {
            let trail = trail_refs.get(index).copied();
            let outcome = self.run_order(*id, &draw.batch, trail, true, keeper);
            outcomes.push((*id, outcome));
        }

        Ok(BatchReport {
            outcomes,
            refund: draw.refund,
        })
    }

    /// A trader executing their own order. Evaluation is identical to the
    /// keeper path, but any non-executed outcome aborts the whole call and
    /// leaves the order in the book: a trader must not be able to cancel an
    /// order through a failed self-execution.
    pub fn self_execute_order(
        &mut self,
        user: AccountId,
        order_id: OrderId,
        feeds: &[FeedId],
        fee_prepaid: Quote,
    ) -> Result<Quote, EngineError> {
        self.begin_call()?;
        let result = self.self_execute_order_inner(user, order_id, feeds, fee_prepaid);
        self.end_call();
        result
    }

    fn self_execute_order_inner(
        &mut self,
        user: AccountId,
        order_id: OrderId,
        feeds: &[FeedId],
        fee_prepaid: Quote,
    ) -> Result<Quote, EngineError> {
        if self.orders.is_processing_paused() {
            return Err(EngineError::ProcessingPaused);
        }

        match self.orders.get(order_id) {
            Some(order) if order.owner != user => {
                return Err(EngineError::NotOrderOwner { order_id, user });
            }
            Some(_) => {}
            None => {
                return Err(EngineError::OrderRejected {
                    order_id,
                    reason: CancelReason::NotFound.to_string(),
                });
            }
        }

        let draw = self.oracle.get_prices(feeds, fee_prepaid)?;
        match self.run_order(order_id, &draw.batch, None, false, user) {
            Outcome::Executed => Ok(draw.refund),
            outcome => Err(EngineError::OrderRejected {
                order_id,
                // non-executed outcomes always carry a reason
                reason: outcome.reason().unwrap_or_default(),
            }),
        }
    }

    /// Process one order against a drawn batch. With `commit` set, failures
    /// cancel the order in the store and emit audit events; without it the
    /// outcome is only reported. A Proceed decision always commits its
    /// execution side effects.
    fn run_order(
        &mut self,
        id: OrderId,
        batch: &PriceBatch,
        trail: Option<TrailRef>,
        commit: bool,
        actor: AccountId,
    ) -> Outcome {
        // unknown or zero-size order: nothing in the store to cancel
        let Some(order) = self.orders.get(id) else {
            return Outcome::Cancelled(CancelReason::NotFound);
        };

        let market = match self.markets.get_market(order.market) {
            Ok(market) => market,
            Err(e) => {
                let reason = CancelReason::Collaborator(e.to_string());
                return self.cancel_order(id, order.market, Price::zero(), batch, reason, commit, actor);
            }
        };
        let asset = match self.markets.get_asset(order.asset) {
            Ok(asset) => asset,
            Err(e) => {
                let reason = CancelReason::Collaborator(e.to_string());
                return self.cancel_order(id, market.id, Price::zero(), batch, reason, commit, actor);
            }
        };

        // longs execute at the ask, shorts at the bid
        let price = resolve_price(batch, market.feed_id, market.spread, order.side == Side::Long);

        // a missing or stale reference reads as zero and fail-open rules apply
        let reference_price = self
            .oracle
            .get_reference_price(asset.reference_feed_id, self.time())
            .unwrap_or_else(|_| Price::zero());
        let reference_mandatory = self.reference_mandatory || market.reference_required;

        let ctx = TriggerContext {
            order: &order,
            market: &market,
            now: self.time(),
            market_order_ttl: self.orders.max_market_order_ttl(),
            trigger_order_ttl: self.orders.max_trigger_order_ttl(),
            batch_published_at: batch.published_at,
            price,
            reference_price,
            reference_mandatory,
            trail,
        };

        match evaluate_trigger(&ctx) {
            TriggerDecision::Skip(reason) => {
                if commit {
                    self.emit_event(EventPayload::ExecutionSkipped {
                        order_id: id,
                        market: market.id,
                        price,
                        publish_time: batch.published_at,
                        reason: reason.to_string(),
                    });
                }
                Outcome::Skipped(reason)
            }
            TriggerDecision::Cancel(reason) => {
                self.cancel_order(id, market.id, price, batch, reason, commit, actor)
            }
            TriggerDecision::Proceed => {
                // one-cancels-other: on the keeper path the linked order goes
                // first, and its failure is fatal for the triggering order.
                // on the self-execution path the linked cancel is deferred
                // until the fill is in: an aborted call must leave the twin
                // untouched.
                if commit {
                    if let Some(linked) = order.cancel_order_id {
                        if let Err(e) = self.orders.cancel(linked, "oco", actor) {
                            let reason = CancelReason::Linked(e.to_string());
                            return self.cancel_order(id, market.id, price, batch, reason, commit, actor);
                        }
                    }
                }

                let opposing = self
                    .positions
                    .get_position(order.owner, order.asset, order.market)
                    .filter(|position| position.side == order.side.opposite());

                let delta = if opposing.is_some() {
                    let trailing_close = order.order_type == OrderType::TrailingStop;
                    self.positions
                        .decrease_position(&order, price, trailing_close, actor)
                } else if order.reduce_only {
                    // nothing to reduce
                    let reason = CancelReason::Reduce;
                    return self.cancel_order(id, market.id, price, batch, reason, commit, actor);
                } else {
                    self.positions.increase_position(&order, price, actor)
                };

                if let Err(e) = delta {
                    let reason = CancelReason::Collaborator(e.to_string());
                    return self.cancel_order(id, market.id, price, batch, reason, commit, actor);
                }

                if !commit {
                    if let Some(linked) = order.cancel_order_id {
                        if let Err(e) = self.orders.cancel(linked, "oco", actor) {
                            return Outcome::Cancelled(CancelReason::Linked(e.to_string()));
                        }
                    }
                }

                if let Err(e) = self.orders.remove(id) {
                    let reason = CancelReason::Collaborator(e.to_string());
                    return self.cancel_order(id, market.id, price, batch, reason, commit, actor);
                }

                if order.order_type == OrderType::TrailingStop {
                    let trail_reference = trail.map(|t| t.price).unwrap_or_else(Price::zero);
                    self.emit_event(EventPayload::TrailingStopExecuted {
                        order_id: id,
                        market: market.id,
                        trail_reference,
                        price,
                    });
                }

                Outcome::Executed
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn cancel_order(
        &mut self,
        id: OrderId,
        market: crate::types::MarketId,
        price: Price,
        batch: &PriceBatch,
        reason: CancelReason,
        commit: bool,
        actor: AccountId,
    ) -> Outcome {
        if commit {
            // the store may have already dropped the order; the outcome stands
            let _ = self.orders.cancel(id, &reason.to_string(), actor);
            self.emit_event(EventPayload::OrderCancelled {
                order_id: id,
                market,
                price,
                publish_time: batch.published_at,
                reason: reason.to_string(),
            });
        }
        Outcome::Cancelled(reason)
    }
}
