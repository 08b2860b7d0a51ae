//! Order book projection (spec §4.3).
//!
//! The teacher's `orderbook/mod.rs` declares `pub mod depth;` but no such
//! file exists in the teacher repo, and `matching_engine.rs` imports a
//! `DepthTracker` type that does not resolve anywhere in the tree — this
//! module is designed fresh, grounded instead on the teacher's *working*
//! `OrderBook::get_best_opposing_levels` aggregation (walk the `BTreeMap`
//! in price order, pair a price with its level), generalized here to sum
//! remaining quantity per level rather than list raw orders.

use serde::Serialize;

use super::book::OrderBook;

pub const DEFAULT_DEPTH_LIMIT: usize = 10;
pub const MAX_DEPTH_LIMIT: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct BidLevel {
    pub price: u64,
    pub qty: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskLevel {
    pub price: u64,
    pub qty: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepthSnapshot {
    pub bid_levels: Vec<BidLevel>,
    pub ask_levels: Vec<AskLevel>,
}

/// Aggregates live limit orders by `(direction, price)` into a depth
/// snapshot. `limit` is clamped to `[1, MAX_DEPTH_LIMIT]`. Called with the
/// per-ticker worker holding exclusive access to `book`, so the result is
/// always a committed snapshot — it cannot observe a trade mid-match.
pub fn snapshot(book: &OrderBook, limit: usize) -> DepthSnapshot {
    let limit = limit.clamp(1, MAX_DEPTH_LIMIT);

    let bid_levels = book
        .bids()
        .iter()
        .rev()
        .take(limit)
        .map(|(price, level)| BidLevel {
            price: *price,
            qty: level.iter().map(|o| o.remaining()).sum(),
        })
        .collect();

    let ask_levels = book
        .asks()
        .iter()
        .take(limit)
        .map(|(price, level)| AskLevel {
            price: *price,
            qty: level.iter().map(|o| o.remaining()).sum(),
        })
        .collect();

    DepthSnapshot {
        bid_levels,
        ask_levels,
    }
}
