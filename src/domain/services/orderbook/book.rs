//! Price-indexed live-order storage for one ticker.
//!
//! Grounded on the teacher's `domain::services::orderbook::orderbook::OrderBook`
//! (`BTreeMap<price, PriceLevel>` per side plus a `HashMap` index for O(1)
//! cancel lookups), simplified to this crate's order model (no
//! stop/stop-limit variants, no time-in-force).

use std::collections::{BTreeMap, HashMap, VecDeque};

use uuid::Uuid;

use crate::domain::models::{Direction, Order};

pub struct OrderBook {
    ticker: String,
    bids: BTreeMap<u64, VecDeque<Order>>,
    asks: BTreeMap<u64, VecDeque<Order>>,
    index: HashMap<Uuid, (Direction, u64)>,
}

impl OrderBook {
    pub fn new(ticker: String) -> Self {
        Self {
            ticker,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Inserts a live limit order at its price level. Caller must ensure
    /// the order is a limit order still eligible to rest (O3).
    pub fn insert(&mut self, order: Order) {
        let price = order.price().expect("resting order must be a limit order");
        let direction = order.direction;
        self.index.insert(order.id, (direction, price));
        self.side_mut(direction)
            .entry(price)
            .or_default()
            .push_back(order);
    }

    /// Removes and returns a live order by id, wherever it rests.
    pub fn remove(&mut self, order_id: Uuid) -> Option<Order> {
        let (direction, price) = *self.index.get(&order_id)?;
        let side = self.side_mut(direction);
        let level = side.get_mut(&price)?;
        let pos = level.iter().position(|o| o.id == order_id)?;
        let order = level.remove(pos)?;
        if level.is_empty() {
            side.remove(&price);
        }
        self.index.remove(&order_id);
        Some(order)
    }

    pub fn contains(&self, order_id: Uuid) -> bool {
        self.index.contains_key(&order_id)
    }

    pub fn best_bid(&self) -> Option<u64> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<u64> {
        self.asks.keys().next().copied()
    }

    pub fn bids(&self) -> &BTreeMap<u64, VecDeque<Order>> {
        &self.bids
    }

    pub fn asks(&self) -> &BTreeMap<u64, VecDeque<Order>> {
        &self.asks
    }

    fn side_mut(&mut self, direction: Direction) -> &mut BTreeMap<u64, VecDeque<Order>> {
        match direction {
            Direction::Buy => &mut self.bids,
            Direction::Sell => &mut self.asks,
        }
    }

    /// Mutable access to the opposing side's price levels, used by the
    /// matching engine to walk counter-orders in price-time order. Not
    /// exposed outside `services` — callers must keep the `index` in sync
    /// via [`OrderBook::forget`] when an order is fully consumed.
    pub(crate) fn opposite_side_mut(
        &mut self,
        incoming: Direction,
    ) -> &mut BTreeMap<u64, VecDeque<Order>> {
        self.side_mut(incoming.opposite())
    }

    /// Drops bookkeeping for an order the matching engine has fully
    /// consumed directly out of a price level (without going through
    /// [`OrderBook::remove`]).
    pub(crate) fn forget(&mut self, order_id: Uuid) {
        self.index.remove(&order_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Order;

    fn limit(direction: Direction, price: u64, qty: u64) -> Order {
        Order::new_limit(Uuid::new_v4(), "MEMCOIN".to_string(), direction, price, qty)
    }

    #[test]
    fn best_bid_and_ask_track_inserted_levels() {
        let mut book = OrderBook::new("MEMCOIN".to_string());
        book.insert(limit(Direction::Buy, 100, 5));
        book.insert(limit(Direction::Buy, 110, 5));
        book.insert(limit(Direction::Sell, 120, 5));
        assert_eq!(book.best_bid(), Some(110));
        assert_eq!(book.best_ask(), Some(120));
    }

    #[test]
    fn remove_clears_empty_price_levels() {
        let mut book = OrderBook::new("MEMCOIN".to_string());
        let order = limit(Direction::Buy, 100, 5);
        let id = order.id;
        book.insert(order);
        assert!(book.remove(id).is_some());
        assert_eq!(book.best_bid(), None);
        assert!(!book.contains(id));
    }

    #[test]
    fn fifo_order_preserved_within_a_price_level() {
        let mut book = OrderBook::new("MEMCOIN".to_string());
        let first = limit(Direction::Sell, 100, 1);
        let first_id = first.id;
        book.insert(first);
        book.insert(limit(Direction::Sell, 100, 1));
        let level = &book.asks()[&100];
        assert_eq!(level.front().unwrap().id, first_id);
    }
}
