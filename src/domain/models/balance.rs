use serde::{Deserialize, Serialize};

/// One `(user, ticker)` row. `amount` is spendable, `blocked` is reserved
/// for the user's live limit orders (invariant B2 in spec).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Balance {
    pub amount: u64,
    pub blocked: u64,
}

impl Balance {
    pub fn total(&self) -> u64 {
        self.amount + self.blocked
    }
}
