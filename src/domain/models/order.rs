use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyExecuted,
    Executed,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPayload {
    pub qty: u64,
    /// Cumulative quantity actually matched before the order was finalized.
    pub filled: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitPayload {
    pub price: u64,
    pub original_qty: u64,
    pub filled: u64,
}

impl LimitPayload {
    pub fn remaining(&self) -> u64 {
        self.original_qty - self.filled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OrderPayload {
    Market(MarketPayload),
    Limit(LimitPayload),
}

/// Tagged-variant order: a shared header plus a market or limit payload,
/// per the spec's variant-orders design note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker: String,
    pub direction: Direction,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: OrderPayload,
}

impl Order {
    pub fn new_market(user_id: Uuid, ticker: String, direction: Direction, qty: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            ticker,
            direction,
            status: OrderStatus::New,
            timestamp: Utc::now(),
            payload: OrderPayload::Market(MarketPayload { qty, filled: 0 }),
        }
    }

    pub fn new_limit(
        user_id: Uuid,
        ticker: String,
        direction: Direction,
        price: u64,
        original_qty: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            ticker,
            direction,
            status: OrderStatus::New,
            timestamp: Utc::now(),
            payload: OrderPayload::Limit(LimitPayload {
                price,
                original_qty,
                filled: 0,
            }),
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self.payload, OrderPayload::Limit(_))
    }

    pub fn as_limit(&self) -> Option<&LimitPayload> {
        match &self.payload {
            OrderPayload::Limit(l) => Some(l),
            OrderPayload::Market(_) => None,
        }
    }

    pub fn as_limit_mut(&mut self) -> Option<&mut LimitPayload> {
        match &mut self.payload {
            OrderPayload::Limit(l) => Some(l),
            OrderPayload::Market(_) => None,
        }
    }

    /// A limit order currently resting in the book (invariant O3).
    pub fn is_live(&self) -> bool {
        matches!(self.status, OrderStatus::New | OrderStatus::PartiallyExecuted)
    }

    pub fn remaining(&self) -> u64 {
        match &self.payload {
            OrderPayload::Limit(l) => l.remaining(),
            OrderPayload::Market(m) => m.qty - m.filled,
        }
    }

    pub fn price(&self) -> Option<u64> {
        match &self.payload {
            OrderPayload::Limit(l) => Some(l.price),
            OrderPayload::Market(_) => None,
        }
    }
}
