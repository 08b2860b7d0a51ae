//! The transactional matching core (spec §4.1) and cancellation handler
//! (spec §4.2).
//!
//! Grounded on the teacher's `MatchingEngine::match_order` /
//! `process_limit_gtc_order` / `process_market_order` / `cancel_order`
//! (price-time walk over a `BTreeMap` side, batched book/index updates).
//! Generalized here to additionally perform balance debits/credits per
//! fill through [`BalanceStore`] — the teacher's engine only ever updates
//! book/order state, it has no balance concept at all — and to implement
//! price-improvement-at-the-resting-price and self-trade prevention,
//! neither of which the teacher's engine does.

use tracing::error;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Direction, Order, OrderPayload, OrderStatus, RUB};
use crate::domain::services::balance_store::BalanceStore;
use crate::domain::services::orderbook::OrderBook;
use crate::domain::models::Trade;

/// Result of one `submit_order` call: the new order's final state, every
/// trade it produced, and the resting counter-orders whose state changed
/// (so the caller can keep its own order index in sync with the book).
pub struct MatchOutcome {
    pub order: Order,
    pub trades: Vec<Trade>,
    pub touched_counters: Vec<Order>,
}

pub async fn submit_order(
    book: &mut OrderBook,
    balances: &BalanceStore,
    order: Order,
) -> DomainResult<MatchOutcome> {
    match &order.payload {
        OrderPayload::Limit(_) => submit_limit(book, balances, order).await,
        OrderPayload::Market(_) => submit_market(book, balances, order).await,
    }
}

async fn submit_limit(
    book: &mut OrderBook,
    balances: &BalanceStore,
    mut order: Order,
) -> DomainResult<MatchOutcome> {
    let own_user = order.user_id;
    let ticker = order.ticker.clone();
    let own_price = order.as_limit().expect("limit payload").price;
    let original_qty = order.as_limit().expect("limit payload").original_qty;

    reserve_for_limit_order(balances, own_user, &ticker, order.direction, own_price, original_qty)
        .await?;

    let mut trades = Vec::new();
    let mut touched = Vec::new();
    let ascending = order.direction == Direction::Buy;
    // Price levels found to contain only the incoming order's own resting
    // orders. Self-trade prevention excludes them from this walk, but a
    // worse-but-still-crossing level behind them may hold other users'
    // orders (P8), so the walk must skip past them rather than stop.
    let mut self_only_prices: std::collections::HashSet<u64> = std::collections::HashSet::new();

    while order.remaining() > 0 {
        let side = book.opposite_side_mut(order.direction);
        let Some(best_price) = best_crossing_price(side, ascending, &self_only_prices) else {
            break;
        };

        let crosses = match order.direction {
            Direction::Buy => own_price >= best_price,
            Direction::Sell => own_price <= best_price,
        };
        if !crosses {
            break;
        }

        let level = side.get_mut(&best_price).expect("level named by best_price exists");
        let Some(pos) = level.iter().position(|o| o.user_id != own_user) else {
            // Every resting order at this price belongs to the same user as
            // the incoming order. Self-trade prevention means we cannot
            // match against this level, but a worse crossing price may still
            // hold eligible counter-orders (spec scenario 5, invariant P8).
            self_only_prices.insert(best_price);
            continue;
        };

        let q = order.remaining().min(level[pos].remaining());
        let p = best_price;
        let counter_user = level[pos].user_id;

        let (buyer, seller) = match order.direction {
            Direction::Buy => (own_user, counter_user),
            Direction::Sell => (counter_user, own_user),
        };

        let mut locked = balances
            .lock_rows([
                (buyer, RUB.to_string()),
                (buyer, ticker.clone()),
                (seller, RUB.to_string()),
                (seller, ticker.clone()),
            ])
            .await;

        let cost = checked_mul(p, q);
        // Price improvement: the incoming buyer reserved at its own
        // (possibly worse) limit price; any improvement versus the
        // resting price is rebated back to spendable `amount` so blocked
        // always tracks `own_price * remaining` exactly (invariant P3).
        // The resting side's own reservation always equals the trade
        // price exactly, so it never needs a rebate.
        let buyer_reserved = if order.direction == Direction::Buy {
            checked_mul(own_price, q)
        } else {
            cost
        };
        let rebate = buyer_reserved - cost;

        // Verify every row's reservation is sufficient before mutating
        // any of them, so a failure here never leaves a partial update.
        let settled = locked.get(buyer, RUB).blocked >= buyer_reserved
            && locked.get(seller, &ticker).blocked >= q;

        if settled {
            locked.get_mut(buyer, RUB).blocked -= buyer_reserved;
            locked.get_mut(buyer, RUB).amount += rebate;
            locked.get_mut(seller, &ticker).blocked -= q;
            locked.get_mut(seller, RUB).amount += cost;
            locked.get_mut(buyer, &ticker).amount += q;
        }
        drop(locked);

        if !settled {
            error!(
                ticker = %ticker, incoming_order = %order.id, counter_order = %level[pos].id,
                "counter-order reservation insufficient at settlement time; stopping match"
            );
            break;
        }

        let counter = &mut level[pos];
        counter.as_limit_mut().expect("resting order is a limit order").filled += q;
        counter.status = if counter.remaining() == 0 {
            OrderStatus::Executed
        } else {
            OrderStatus::PartiallyExecuted
        };
        order.as_limit_mut().expect("limit payload").filled += q;
        trades.push(Trade::new(ticker.clone(), q, p));

        if counter.remaining() == 0 {
            let filled_counter = level.remove(pos).expect("position just matched");
            if level.is_empty() {
                side.remove(&best_price);
            }
            book.forget(filled_counter.id);
            touched.push(filled_counter);
        } else {
            touched.push(counter.clone());
        }
    }

    finalize_limit_status(&mut order);
    if order.is_live() {
        book.insert(order.clone());
    }

    Ok(MatchOutcome {
        order,
        trades,
        touched_counters: touched,
    })
}

async fn submit_market(
    book: &mut OrderBook,
    balances: &BalanceStore,
    mut order: Order,
) -> DomainResult<MatchOutcome> {
    let own_user = order.user_id;
    let ticker = order.ticker.clone();
    let ascending = order.direction == Direction::Buy;

    let mut trades = Vec::new();
    let mut touched = Vec::new();
    let mut self_only_prices: std::collections::HashSet<u64> = std::collections::HashSet::new();

    while order.remaining() > 0 {
        let side = book.opposite_side_mut(order.direction);
        let Some(best_price) = best_crossing_price(side, ascending, &self_only_prices) else {
            break;
        };
        let level = side.get_mut(&best_price).expect("level named by best_price exists");
        let Some(pos) = level.iter().position(|o| o.user_id != own_user) else {
            // Same self-trade handling as the limit-order walk: skip this
            // price level, a market order has no price cap so it keeps
            // walking the rest of the book (P8).
            self_only_prices.insert(best_price);
            continue;
        };

        let q = order.remaining().min(level[pos].remaining());
        let p = best_price;
        let cost = checked_mul(p, q);
        let counter_user = level[pos].user_id;
        let (buyer, seller) = match order.direction {
            Direction::Buy => (own_user, counter_user),
            Direction::Sell => (counter_user, own_user),
        };

        // Market orders never pre-reserve: verify the market side's
        // spendable balance can cover this trade before committing it. If
        // it can't, stop here — trades already applied remain valid.
        let (required_user, required_ticker, required_amount) = match order.direction {
            Direction::Buy => (buyer, RUB, cost),
            Direction::Sell => (seller, ticker.as_str(), q),
        };
        if balances.snapshot(required_user, required_ticker).await.amount < required_amount {
            break;
        }

        let mut locked = balances
            .lock_rows([
                (buyer, RUB.to_string()),
                (buyer, ticker.clone()),
                (seller, RUB.to_string()),
                (seller, ticker.clone()),
            ])
            .await;

        let settled = match order.direction {
            Direction::Buy => {
                let buyer_rub = locked.get_mut(buyer, RUB);
                if buyer_rub.amount < cost {
                    false
                } else {
                    buyer_rub.amount -= cost;
                    let seller_asset = locked.get_mut(seller, &ticker);
                    if seller_asset.blocked < q {
                        false
                    } else {
                        seller_asset.blocked -= q;
                        locked.get_mut(seller, RUB).amount += cost;
                        locked.get_mut(buyer, &ticker).amount += q;
                        true
                    }
                }
            }
            Direction::Sell => {
                let seller_asset = locked.get_mut(seller, &ticker);
                if seller_asset.amount < q {
                    false
                } else {
                    seller_asset.amount -= q;
                    let buyer_rub = locked.get_mut(buyer, RUB);
                    if buyer_rub.blocked < cost {
                        false
                    } else {
                        buyer_rub.blocked -= cost;
                        locked.get_mut(seller, RUB).amount += cost;
                        locked.get_mut(buyer, &ticker).amount += q;
                        true
                    }
                }
            }
        };
        drop(locked);

        if !settled {
            error!(
                ticker = %ticker, incoming_order = %order.id, counter_order = %level[pos].id,
                "counter-order reservation insufficient at settlement time; stopping match"
            );
            break;
        }

        let counter = &mut level[pos];
        counter.as_limit_mut().expect("resting order is a limit order").filled += q;
        counter.status = if counter.remaining() == 0 {
            OrderStatus::Executed
        } else {
            OrderStatus::PartiallyExecuted
        };
        if let OrderPayload::Market(m) = &mut order.payload {
            m.filled += q;
        }
        trades.push(Trade::new(ticker.clone(), q, p));

        if counter.remaining() == 0 {
            let filled_counter = level.remove(pos).expect("position just matched");
            if level.is_empty() {
                side.remove(&best_price);
            }
            book.forget(filled_counter.id);
            touched.push(filled_counter);
        } else {
            touched.push(counter.clone());
        }
    }

    // Market orders only ever land on EXECUTED or REJECTED (the data model
    // has no partial-fill status for them): any fill at all is a success,
    // the unfilled remainder is simply discarded.
    let filled = match &order.payload {
        OrderPayload::Market(m) => m.filled,
        OrderPayload::Limit(_) => unreachable!("submit_market only called with market orders"),
    };
    order.status = if filled > 0 {
        OrderStatus::Executed
    } else {
        OrderStatus::Rejected
    };

    Ok(MatchOutcome {
        order,
        trades,
        touched_counters: touched,
    })
}

/// Cancels a live limit order: reverses its remaining reservation and
/// marks it terminal. Caller (the ticker worker) has already verified
/// ownership and liveness.
pub async fn cancel(
    book: &mut OrderBook,
    balances: &BalanceStore,
    mut order: Order,
) -> DomainResult<Order> {
    book.remove(order.id);

    let limit = order.as_limit().expect("cancel only called on limit orders").clone();
    let remaining = limit.remaining();

    match order.direction {
        Direction::Buy => {
            let refund = checked_mul(limit.price, remaining);
            let mut locked = balances.lock_rows([(order.user_id, RUB.to_string())]).await;
            let bal = locked.get_mut(order.user_id, RUB);
            bal.blocked -= refund;
            bal.amount += refund;
        }
        Direction::Sell => {
            let mut locked = balances
                .lock_rows([(order.user_id, order.ticker.clone())])
                .await;
            let bal = locked.get_mut(order.user_id, &order.ticker);
            bal.blocked -= remaining;
            bal.amount += remaining;
        }
    }

    order.status = OrderStatus::Cancelled;
    Ok(order)
}

async fn reserve_for_limit_order(
    balances: &BalanceStore,
    user_id: Uuid,
    ticker: &str,
    direction: Direction,
    price: u64,
    original_qty: u64,
) -> DomainResult<()> {
    match direction {
        Direction::Buy => {
            let cost = checked_mul(price, original_qty);
            let mut locked = balances.lock_rows([(user_id, RUB.to_string())]).await;
            let bal = locked.get_mut(user_id, RUB);
            if bal.amount < cost {
                return Err(DomainError::InsufficientFunds);
            }
            bal.amount -= cost;
            bal.blocked += cost;
        }
        Direction::Sell => {
            let mut locked = balances.lock_rows([(user_id, ticker.to_string())]).await;
            let bal = locked.get_mut(user_id, ticker);
            if bal.amount < original_qty {
                return Err(DomainError::InsufficientAsset);
            }
            bal.amount -= original_qty;
            bal.blocked += original_qty;
        }
    }
    Ok(())
}

fn finalize_limit_status(order: &mut Order) {
    let limit = order.as_limit().expect("limit payload");
    order.status = if limit.filled == limit.original_qty {
        OrderStatus::Executed
    } else if limit.filled > 0 {
        OrderStatus::PartiallyExecuted
    } else {
        OrderStatus::New
    };
}

/// Best price level on `side`, excluding `skip` (price levels already found
/// to hold only the incoming order's own resting orders this walk).
fn best_crossing_price(
    side: &std::collections::BTreeMap<u64, std::collections::VecDeque<Order>>,
    ascending: bool,
    skip: &std::collections::HashSet<u64>,
) -> Option<u64> {
    if ascending {
        side.keys().find(|price| !skip.contains(price)).copied()
    } else {
        side.keys().rev().find(|price| !skip.contains(price)).copied()
    }
}

fn checked_mul(price: u64, qty: u64) -> u64 {
    (price as u128 * qty as u128)
        .try_into()
        .expect("price * qty exceeds u64 range")
}
