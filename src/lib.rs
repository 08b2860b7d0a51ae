pub mod api;
pub mod config;
pub mod domain;

pub use domain::models::{Balance, Direction, Instrument, Order, OrderStatus, Role, Trade, User, RUB};
pub use domain::services::orderbook::{OrderBook, DepthSnapshot, BidLevel, AskLevel};
pub use domain::services::{BalanceStore, Exchange};
pub use domain::error::{DomainError, DomainResult};
