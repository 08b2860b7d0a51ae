pub mod balance;
pub mod instrument;
pub mod order;
pub mod trade;
pub mod user;

pub use balance::Balance;
pub use instrument::Instrument;
pub use order::{Direction, LimitPayload, MarketPayload, Order, OrderPayload, OrderStatus};
pub use trade::Trade;
pub use user::{Role, User};

/// The quote asset. Never traded directly; every balance row for a user
/// implicitly includes one for this ticker.
pub const RUB: &str = "RUB";
