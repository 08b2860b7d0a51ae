//! Per-`(user, ticker)` balance rows with deterministic multi-row locking.
//!
//! Grounded on the teacher's `Arc<RwLock<HashMap<...>>>` registry idiom
//! (`orderbook_manager_service.rs`), applied here to balance rows instead
//! of per-instrument channels. The teacher has no balance concept at all;
//! the row-locking discipline itself is new, required by the concurrency
//! model in the spec.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::Balance;

pub type BalanceKey = (Uuid, String);

#[derive(Default)]
pub struct BalanceStore {
    rows: RwLock<HashMap<BalanceKey, Arc<Mutex<Balance>>>>,
}

/// A set of balance rows locked together for one transaction. Rows are
/// acquired in sorted key order (see [`BalanceStore::lock_rows`]) so two
/// concurrent transactions touching overlapping rows can never deadlock.
pub struct LockedRows {
    guards: HashMap<BalanceKey, OwnedMutexGuard<Balance>>,
}

impl LockedRows {
    fn key(user_id: Uuid, ticker: &str) -> BalanceKey {
        (user_id, ticker.to_string())
    }

    pub fn get(&self, user_id: Uuid, ticker: &str) -> Balance {
        *self
            .guards
            .get(&Self::key(user_id, ticker))
            .expect("row locked for this transaction")
    }

    pub fn get_mut(&mut self, user_id: Uuid, ticker: &str) -> &mut Balance {
        self.guards
            .get_mut(&Self::key(user_id, ticker))
            .expect("row locked for this transaction")
    }
}

impl BalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn row(&self, user_id: Uuid, ticker: &str) -> Arc<Mutex<Balance>> {
        {
            let rows = self.rows.read().await;
            if let Some(existing) = rows.get(&(user_id, ticker.to_string())) {
                return existing.clone();
            }
        }
        let mut rows = self.rows.write().await;
        rows.entry((user_id, ticker.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(Balance::default())))
            .clone()
    }

    pub async fn snapshot(&self, user_id: Uuid, ticker: &str) -> Balance {
        let row = self.row(user_id, ticker).await;
        let guard = row.lock().await;
        *guard
    }

    pub async fn all_for_user(&self, user_id: Uuid) -> HashMap<String, Balance> {
        let rows = self.rows.read().await;
        let mut out = HashMap::new();
        for (key, row) in rows.iter() {
            if key.0 == user_id {
                out.insert(key.1.clone(), *row.lock().await);
            }
        }
        out
    }

    pub async fn deposit(&self, user_id: Uuid, ticker: &str, amount: u64) {
        let row = self.row(user_id, ticker).await;
        let mut bal = row.lock().await;
        bal.amount += amount;
    }

    pub async fn withdraw(&self, user_id: Uuid, ticker: &str, amount: u64) -> DomainResult<()> {
        let row = self.row(user_id, ticker).await;
        let mut bal = row.lock().await;
        if bal.amount < amount {
            return Err(DomainError::InsufficientFunds);
        }
        bal.amount -= amount;
        Ok(())
    }

    /// Locks every row named by `keys` (deduplicated, sorted into a total
    /// order) and returns a handle giving mutable access to each. Rows not
    /// yet present are created lazily with a zero balance.
    pub async fn lock_rows(&self, keys: impl IntoIterator<Item = BalanceKey>) -> LockedRows {
        let mut sorted: Vec<BalanceKey> = keys.into_iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = HashMap::with_capacity(sorted.len());
        for key in sorted {
            let row = self.row(key.0, &key.1).await;
            let guard = row.lock_owned().await;
            guards.insert(key, guard);
        }
        LockedRows { guards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deposit_then_withdraw_round_trips() {
        let store = BalanceStore::new();
        let user = Uuid::new_v4();
        store.deposit(user, "RUB", 1000).await;
        store.withdraw(user, "RUB", 1000).await.unwrap();
        let bal = store.snapshot(user, "RUB").await;
        assert_eq!(bal.amount, 0);
        assert_eq!(bal.blocked, 0);
    }

    #[tokio::test]
    async fn withdraw_more_than_available_is_rejected() {
        let store = BalanceStore::new();
        let user = Uuid::new_v4();
        store.deposit(user, "RUB", 10).await;
        let err = store.withdraw(user, "RUB", 11).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds));
    }

    #[tokio::test]
    async fn locked_rows_mutate_independently_of_unrelated_rows() {
        let store = BalanceStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.deposit(a, "RUB", 500).await;
        store.deposit(b, "MEMCOIN", 5).await;

        {
            let mut locked = store
                .lock_rows([(a, "RUB".to_string()), (b, "MEMCOIN".to_string())])
                .await;
            locked.get_mut(a, "RUB").amount -= 100;
            locked.get_mut(b, "MEMCOIN").amount -= 1;
        }

        assert_eq!(store.snapshot(a, "RUB").await.amount, 400);
        assert_eq!(store.snapshot(b, "MEMCOIN").await.amount, 4);
    }
}
