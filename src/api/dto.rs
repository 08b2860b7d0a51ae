//! Request/response DTOs for every endpoint in spec §6.
//!
//! Grounded on the teacher's `inbounds::dtos` (`impl From<Dto> for Order`
//! conversion idiom) and `original_source/wintochka/orders/serializers.py`
//! for the exact request shape (market orders omit `price`, limit orders
//! require it; `PlaceOrderRequest`'s optional `price` field mirrors the
//! serializer-class dispatch `OrderCreateView.post` does on
//! `'price' not in request.data`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::{Direction, Instrument, Order, OrderPayload, OrderStatus, Role, Trade};
use crate::domain::services::exchange::DeletedUserSnapshot;
use crate::domain::services::orderbook::{AskLevel, BidLevel, DepthSnapshot};

// ---- registration / users -------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub api_key: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeletedUserResponse {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub api_key: Uuid,
    pub balances: HashMap<String, crate::domain::models::Balance>,
}

impl From<DeletedUserSnapshot> for DeletedUserResponse {
    fn from(s: DeletedUserSnapshot) -> Self {
        Self {
            id: s.id,
            name: s.name,
            role: s.role,
            api_key: s.api_key,
            balances: s.balances,
        }
    }
}

// ---- instruments ------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct InstrumentResponse {
    pub ticker: String,
    pub name: String,
}

impl From<Instrument> for InstrumentResponse {
    fn from(i: Instrument) -> Self {
        Self { ticker: i.ticker, name: i.name }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInstrumentRequest {
    pub name: String,
    pub ticker: String,
}

#[derive(Debug, Serialize)]
pub struct CreateInstrumentResponse {
    pub success: bool,
    pub instrument: InstrumentResponse,
}

// ---- balance ------------------------------------------------------

pub type BalanceResponse = HashMap<String, u64>;

#[derive(Debug, Deserialize)]
pub struct AdminBalanceRequest {
    pub user_id: Uuid,
    pub ticker: String,
    pub amount: u64,
}

// ---- orders ------------------------------------------------------

/// `price` present selects the limit branch, absent selects market — the
/// same dispatch `OrderCreateView.post` makes in the original source by
/// checking `'price' not in request.data`.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub direction: Direction,
    pub ticker: String,
    pub qty: u64,
    #[serde(default)]
    pub price: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const OK: Self = Self { success: true };
}

#[derive(Debug, Serialize)]
#[serde(tag = "order_type", rename_all = "lowercase")]
pub enum OrderResponse {
    Market {
        id: Uuid,
        user_id: Uuid,
        ticker: String,
        direction: Direction,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
        qty: u64,
        filled: u64,
    },
    Limit {
        id: Uuid,
        user_id: Uuid,
        ticker: String,
        direction: Direction,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
        price: u64,
        original_qty: u64,
        filled: u64,
    },
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        match order.payload {
            OrderPayload::Market(m) => OrderResponse::Market {
                id: order.id,
                user_id: order.user_id,
                ticker: order.ticker,
                direction: order.direction,
                status: order.status,
                timestamp: order.timestamp,
                qty: m.qty,
                filled: m.filled,
            },
            OrderPayload::Limit(l) => OrderResponse::Limit {
                id: order.id,
                user_id: order.user_id,
                ticker: order.ticker,
                direction: order.direction,
                status: order.status,
                timestamp: order.timestamp,
                price: l.price,
                original_qty: l.original_qty,
                filled: l.filled,
            },
        }
    }
}

// ---- order book / trade history projections ------------------------

#[derive(Debug, Serialize)]
pub struct OrderbookResponse {
    pub bid_levels: Vec<BidLevel>,
    pub ask_levels: Vec<AskLevel>,
}

impl From<DepthSnapshot> for OrderbookResponse {
    fn from(s: DepthSnapshot) -> Self {
        Self { bid_levels: s.bid_levels, ask_levels: s.ask_levels }
    }
}

#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub ticker: String,
    pub amount: u64,
    pub price: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<Trade> for TradeResponse {
    fn from(t: Trade) -> Self {
        Self { ticker: t.ticker, amount: t.qty, price: t.price, timestamp: t.timestamp }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<usize>,
}
