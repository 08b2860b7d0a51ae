use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only trade record. Invariant T1: the sum of `qty` across a
/// window equals the sum of `filled` deltas on both sides within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub ticker: String,
    pub qty: u64,
    pub price: u64,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn new(ticker: String, qty: u64, price: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker,
            qty,
            price,
            timestamp: Utc::now(),
        }
    }
}
