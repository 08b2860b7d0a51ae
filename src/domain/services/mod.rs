pub mod balance_store;
pub mod orderbook;
pub mod matching_engine;
pub mod ticker_worker;
pub mod exchange;

pub use balance_store::BalanceStore;
pub use exchange::Exchange;
