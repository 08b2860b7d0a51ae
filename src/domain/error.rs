use thiserror::Error;
use uuid::Uuid;

/// Domain-layer error taxonomy. Mirrors the teacher's `MatchingError`/
/// `OrderbookError` split but consolidated into one enum since this crate's
/// engine, balance store and exchange registry all share one error surface
/// at the `api` boundary.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Auth,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("insufficient asset")]
    InsufficientAsset,

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn order_not_found(id: Uuid) -> Self {
        DomainError::NotFound(format!("order {id}"))
    }

    pub fn instrument_not_found(ticker: &str) -> Self {
        DomainError::NotFound(format!("instrument {ticker}"))
    }

    pub fn user_not_found(id: Uuid) -> Self {
        DomainError::NotFound(format!("user {id}"))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
