//! One async task per ticker, serializing order submission and cancellation
//! for that ticker's book (spec §5 option (b)).
//!
//! Grounded on the teacher's `orderbook::orderbook_worker::{OrderBookWorker,
//! OrderBookClient, OrderBookCommand}` (`tokio::mpsc` command channel +
//! `oneshot` response pattern, kept verbatim in shape). Generalized to run
//! as a plain `tokio::spawn`ed task rather than a dedicated OS thread with a
//! nested single-threaded runtime (this crate's server is already async
//! end to end), and to own the full per-ticker transactional state — the
//! live `OrderBook`, every order ever submitted for the ticker (so
//! `GET /order/{id}` can find terminal orders too), and the append-only
//! trade log — instead of only the raw book.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Order, Trade};
use crate::domain::services::balance_store::BalanceStore;
use crate::domain::services::matching_engine;
use crate::domain::services::orderbook::{depth, DepthSnapshot, OrderBook};

const COMMAND_QUEUE_DEPTH: usize = 1024;

/// Trade-history projection defaults (spec §4.5).
pub const DEFAULT_TRADE_LIMIT: usize = 10;
pub const MAX_TRADE_LIMIT: usize = 100;

enum Command {
    Submit {
        order: Order,
        reply: oneshot::Sender<DomainResult<matching_engine::MatchOutcome>>,
    },
    Cancel {
        order_id: Uuid,
        user_id: Uuid,
        reply: oneshot::Sender<DomainResult<Order>>,
    },
    GetOrder {
        order_id: Uuid,
        reply: oneshot::Sender<Option<Order>>,
    },
    ListForUser {
        user_id: Uuid,
        reply: oneshot::Sender<Vec<Order>>,
    },
    Depth {
        limit: usize,
        reply: oneshot::Sender<DepthSnapshot>,
    },
    Trades {
        limit: usize,
        reply: oneshot::Sender<Vec<Trade>>,
    },
}

/// A handle to a running ticker worker task. Cheap to clone; every clone
/// shares the same command queue, so all operations against one ticker are
/// still fully serialized regardless of how many handles exist.
#[derive(Clone)]
pub struct TickerHandle {
    tx: mpsc::Sender<Command>,
}

impl TickerHandle {
    pub async fn submit(&self, order: Order) -> DomainResult<matching_engine::MatchOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit { order, reply }).await;
        rx.await.unwrap_or_else(|_| {
            Err(DomainError::Internal("ticker worker dropped response channel".into()))
        })
    }

    pub async fn cancel(&self, order_id: Uuid, user_id: Uuid) -> DomainResult<Order> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Cancel { order_id, user_id, reply }).await;
        rx.await.unwrap_or_else(|_| {
            Err(DomainError::Internal("ticker worker dropped response channel".into()))
        })
    }

    pub async fn get_order(&self, order_id: Uuid) -> Option<Order> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetOrder { order_id, reply }).await;
        rx.await.ok().flatten()
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Vec<Order> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ListForUser { user_id, reply }).await;
        rx.await.unwrap_or_default()
    }

    pub async fn depth(&self, limit: usize) -> DepthSnapshot {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Depth { limit, reply }).await;
        rx.await.unwrap_or(DepthSnapshot { bid_levels: vec![], ask_levels: vec![] })
    }

    pub async fn trades(&self, limit: usize) -> Vec<Trade> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Trades { limit, reply }).await;
        rx.await.unwrap_or_default()
    }

    async fn send(&self, cmd: Command) {
        // The receiving task only ever stops when its handle is dropped
        // entirely, which happens only alongside the exchange itself; a
        // send failure here would indicate a bug, not a normal condition.
        let _ = self.tx.send(cmd).await;
    }
}

/// Spawns the worker task for `ticker` and returns a handle to it.
pub fn spawn(ticker: String, balances: std::sync::Arc<BalanceStore>) -> TickerHandle {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    tokio::spawn(run(ticker, balances, rx));
    TickerHandle { tx }
}

async fn run(ticker: String, balances: std::sync::Arc<BalanceStore>, mut rx: mpsc::Receiver<Command>) {
    let mut book = OrderBook::new(ticker.clone());
    let mut orders: HashMap<Uuid, Order> = HashMap::new();
    let mut trade_log: Vec<Trade> = Vec::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Submit { order, reply } => {
                let result = matching_engine::submit_order(&mut book, &balances, order).await;
                if let Ok(outcome) = &result {
                    orders.insert(outcome.order.id, outcome.order.clone());
                    for counter in &outcome.touched_counters {
                        orders.insert(counter.id, counter.clone());
                    }
                    trade_log.extend(outcome.trades.iter().cloned());
                }
                let _ = reply.send(result);
            }
            Command::Cancel { order_id, user_id, reply } => {
                let result = (|| {
                    let order = orders
                        .get(&order_id)
                        .cloned()
                        .filter(|o| o.user_id == user_id)
                        .ok_or_else(|| DomainError::order_not_found(order_id))?;
                    if !order.is_limit() {
                        return Err(DomainError::IllegalState("market orders cannot be cancelled".into()));
                    }
                    if !order.is_live() {
                        return Err(DomainError::IllegalState(format!(
                            "order {order_id} is already {:?}",
                            order.status
                        )));
                    }
                    Ok(order)
                })();
                let result = match result {
                    Ok(order) => matching_engine::cancel(&mut book, &balances, order).await,
                    Err(e) => Err(e),
                };
                if let Ok(cancelled) = &result {
                    orders.insert(cancelled.id, cancelled.clone());
                }
                let _ = reply.send(result);
            }
            Command::GetOrder { order_id, reply } => {
                let _ = reply.send(orders.get(&order_id).cloned());
            }
            Command::ListForUser { user_id, reply } => {
                let mut mine: Vec<Order> = orders
                    .values()
                    .filter(|o| o.user_id == user_id)
                    .cloned()
                    .collect();
                mine.sort_by_key(|o| o.timestamp);
                let _ = reply.send(mine);
            }
            Command::Depth { limit, reply } => {
                let _ = reply.send(depth::snapshot(&book, limit));
            }
            Command::Trades { limit, reply } => {
                let limit = limit.clamp(1, MAX_TRADE_LIMIT);
                let recent: Vec<Trade> = trade_log.iter().rev().take(limit).cloned().collect();
                let _ = reply.send(recent);
            }
        }
    }
}
