//! In-process registry owning users, instruments, balances, and one
//! [`TickerHandle`] per ticker. The single entry point the `api` layer
//! talks to.
//!
//! Grounded on the teacher's
//! `orderbook_manager::orderbook_manager_service::OrderbookManagerServiceImpl`
//! (map of instrument id → channel to its worker, `Arc<RwLock<HashMap<...>>>`
//! registry). Generalized to also own the user table, instrument table, and
//! [`BalanceStore`], and to spawn [`TickerHandle`] workers with
//! `tokio::spawn` instead of the teacher's OS-thread-per-instrument design.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Balance, Direction, Instrument, Order, Role, Trade, User, RUB};
use crate::domain::services::balance_store::BalanceStore;
use crate::domain::services::orderbook::DepthSnapshot;
use crate::domain::services::ticker_worker::{self, TickerHandle, DEFAULT_TRADE_LIMIT, MAX_TRADE_LIMIT};

/// Snapshot of a deleted user, returned by the admin user-deletion endpoint
/// (spec §6). Grounded on `wintochka/admin_api/views.py`'s
/// `AdminDeleteUserView`, which returns the serialized user; this crate's
/// serializer nests the user's balance table too, since admin deletion is
/// the one place a caller needs both at once.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeletedUserSnapshot {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub api_key: Uuid,
    pub balances: HashMap<String, Balance>,
}

pub struct Exchange {
    users_by_id: RwLock<HashMap<Uuid, User>>,
    users_by_key: RwLock<HashMap<Uuid, Uuid>>,
    instruments: RwLock<HashMap<String, Instrument>>,
    balances: Arc<BalanceStore>,
    tickers: RwLock<HashMap<String, TickerHandle>>,
    /// `order_id -> ticker`, populated when an order is placed so
    /// `GET/DELETE /order/{id}` can route without the caller naming a
    /// ticker.
    order_tickers: RwLock<HashMap<Uuid, String>>,
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            users_by_id: RwLock::new(HashMap::new()),
            users_by_key: RwLock::new(HashMap::new()),
            instruments: RwLock::new(HashMap::new()),
            balances: Arc::new(BalanceStore::new()),
            tickers: RwLock::new(HashMap::new()),
            order_tickers: RwLock::new(HashMap::new()),
        }
    }

    // ---- users ----------------------------------------------------

    pub async fn register_user(&self, name: String) -> User {
        let user = User::new(name, Role::User);
        self.users_by_key.write().await.insert(user.api_key, user.id);
        self.users_by_id.write().await.insert(user.id, user.clone());
        user
    }

    /// Bootstraps an admin account out of band. `wintochka`'s admin role is
    /// likewise never granted over HTTP — it comes from Django's
    /// `createsuperuser`/fixture loading, outside the API surface spec §6
    /// describes. This is the Rust equivalent: a deployment's startup code
    /// calls this once, not a route handler.
    pub async fn register_admin(&self, name: String) -> User {
        let user = User::new(name, Role::Admin);
        self.users_by_key.write().await.insert(user.api_key, user.id);
        self.users_by_id.write().await.insert(user.id, user.clone());
        user
    }

    pub async fn authenticate(&self, api_key: Uuid) -> DomainResult<User> {
        let user_id = *self
            .users_by_key
            .read()
            .await
            .get(&api_key)
            .ok_or(DomainError::Auth)?;
        self.users_by_id
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(DomainError::Auth)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> DomainResult<DeletedUserSnapshot> {
        let user = self
            .users_by_id
            .write()
            .await
            .remove(&user_id)
            .ok_or_else(|| DomainError::user_not_found(user_id))?;
        self.users_by_key.write().await.remove(&user.api_key);
        let balances = self.balances.all_for_user(user_id).await;
        Ok(DeletedUserSnapshot {
            id: user.id,
            name: user.name,
            role: user.role,
            api_key: user.api_key,
            balances,
        })
    }

    // ---- instruments ------------------------------------------------

    pub async fn create_instrument(&self, ticker: String, name: String) -> DomainResult<Instrument> {
        if is_quote_ticker(&ticker) {
            return Err(DomainError::Conflict(format!("{ticker} is the reserved quote asset")));
        }
        let mut instruments = self.instruments.write().await;
        if instruments.contains_key(&ticker) {
            return Err(DomainError::Conflict(format!("instrument {ticker} already exists")));
        }
        let instrument = Instrument { ticker: ticker.clone(), name };
        instruments.insert(ticker.clone(), instrument.clone());
        drop(instruments);
        self.tickers
            .write()
            .await
            .entry(ticker.clone())
            .or_insert_with(|| ticker_worker::spawn(ticker, self.balances.clone()));
        Ok(instrument)
    }

    pub async fn delete_instrument(&self, ticker: &str) -> DomainResult<()> {
        let removed = self.instruments.write().await.remove(ticker);
        if removed.is_none() {
            return Err(DomainError::instrument_not_found(ticker));
        }
        self.tickers.write().await.remove(ticker);
        Ok(())
    }

    pub async fn list_instruments(&self) -> Vec<Instrument> {
        let mut out: Vec<Instrument> = self.instruments.read().await.values().cloned().collect();
        out.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        out
    }

    async fn require_ticker(&self, ticker: &str) -> DomainResult<TickerHandle> {
        self.tickers
            .read()
            .await
            .get(ticker)
            .cloned()
            .ok_or_else(|| DomainError::instrument_not_found(ticker))
    }

    // ---- balances -----------------------------------------------------

    pub async fn balances_for_user(&self, user_id: Uuid) -> HashMap<String, u64> {
        self.balances
            .all_for_user(user_id)
            .await
            .into_iter()
            .map(|(ticker, balance)| (ticker, balance.amount))
            .collect()
    }

    pub async fn admin_deposit(&self, user_id: Uuid, ticker: &str, amount: u64) -> DomainResult<()> {
        self.require_user(user_id).await?;
        self.balances.deposit(user_id, ticker, amount).await;
        Ok(())
    }

    pub async fn admin_withdraw(&self, user_id: Uuid, ticker: &str, amount: u64) -> DomainResult<()> {
        self.require_user(user_id).await?;
        self.balances.withdraw(user_id, ticker, amount).await
    }

    async fn require_user(&self, user_id: Uuid) -> DomainResult<()> {
        if self.users_by_id.read().await.contains_key(&user_id) {
            Ok(())
        } else {
            Err(DomainError::user_not_found(user_id))
        }
    }

    // ---- orders ---------------------------------------------------

    pub async fn place_market_order(
        &self,
        user_id: Uuid,
        ticker: String,
        direction: Direction,
        qty: u64,
    ) -> DomainResult<Order> {
        let handle = self.require_ticker(&ticker).await?;
        let order = Order::new_market(user_id, ticker.clone(), direction, qty);
        self.order_tickers.write().await.insert(order.id, ticker);
        let outcome = handle.submit(order).await?;
        Ok(outcome.order)
    }

    pub async fn place_limit_order(
        &self,
        user_id: Uuid,
        ticker: String,
        direction: Direction,
        price: u64,
        qty: u64,
    ) -> DomainResult<Order> {
        let handle = self.require_ticker(&ticker).await?;
        let order = Order::new_limit(user_id, ticker.clone(), direction, price, qty);
        self.order_tickers.write().await.insert(order.id, ticker);
        let outcome = handle.submit(order).await?;
        Ok(outcome.order)
    }

    pub async fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> DomainResult<Order> {
        let ticker = self
            .order_tickers
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or_else(|| DomainError::order_not_found(order_id))?;
        let handle = self.require_ticker(&ticker).await?;
        handle.cancel(order_id, user_id).await
    }

    pub async fn get_order(&self, order_id: Uuid, user_id: Uuid) -> DomainResult<Order> {
        let ticker = self
            .order_tickers
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or_else(|| DomainError::order_not_found(order_id))?;
        let handle = self.require_ticker(&ticker).await?;
        handle
            .get_order(order_id)
            .await
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| DomainError::order_not_found(order_id))
    }

    /// All orders belonging to `user_id`, across every ticker. Polls every
    /// live ticker worker; acceptable at this scale (one message per
    /// ticker, spec places no bound on instrument count but production
    /// deployments of this system run a handful of tickers).
    pub async fn list_orders_for_user(&self, user_id: Uuid) -> Vec<Order> {
        let handles: Vec<TickerHandle> = self.tickers.read().await.values().cloned().collect();
        let mut out = Vec::new();
        for handle in handles {
            out.extend(handle.list_for_user(user_id).await);
        }
        out.sort_by_key(|o| o.timestamp);
        out
    }

    // ---- projections ------------------------------------------------

    pub async fn orderbook(&self, ticker: &str, limit: usize) -> DomainResult<DepthSnapshot> {
        let handle = self.require_ticker(ticker).await?;
        Ok(handle.depth(limit).await)
    }

    pub async fn trades(&self, ticker: &str, limit: usize) -> DomainResult<Vec<Trade>> {
        let handle = self.require_ticker(ticker).await?;
        Ok(handle.trades(limit).await)
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

/// RUB is the fixed quote ticker; it is never listed as an instrument but
/// every user implicitly has a balance row for it (spec §3).
pub fn is_quote_ticker(ticker: &str) -> bool {
    ticker == RUB
}

pub const fn default_trade_limit() -> usize {
    DEFAULT_TRADE_LIMIT
}

pub const fn max_trade_limit() -> usize {
    MAX_TRADE_LIMIT
}
