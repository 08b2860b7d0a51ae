//! Axum handlers for every endpoint in spec §6.
//!
//! Grounded on the teacher's `api::routes` (handler signatures taking
//! `Extension<Arc<AppState>>`, `Path`, `Query`, returning `ApiResult<impl
//! IntoResponse>`) generalized to route through [`Exchange`] instead of a
//! raw map of matching engines, and to the endpoint set spec §6 names.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::api::dto::*;
use crate::api::error::{ApiError, ApiResult};
use crate::domain::services::exchange::{default_trade_limit, is_quote_ticker, max_trade_limit};
use crate::domain::services::orderbook::{DEFAULT_DEPTH_LIMIT, MAX_DEPTH_LIMIT};
use crate::domain::services::Exchange;

const TICKER_PATTERN_HINT: &str = "ticker must match ^[A-Z]{2,10}$";

fn validate_ticker(ticker: &str) -> ApiResult<()> {
    let ok = (2..=10).contains(&ticker.len()) && ticker.bytes().all(|b| b.is_ascii_uppercase());
    if ok {
        Ok(())
    } else {
        Err(ApiError::Validation(TICKER_PATTERN_HINT.to_string()))
    }
}

// ---- public ------------------------------------------------------

pub async fn register(
    State(exchange): State<Arc<Exchange>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    let user = exchange.register_user(req.name).await;
    Ok(Json(RegisterResponse {
        id: user.id,
        name: user.name,
        role: user.role,
        api_key: user.api_key,
    }))
}

pub async fn list_instruments(State(exchange): State<Arc<Exchange>>) -> impl IntoResponse {
    let instruments: Vec<InstrumentResponse> = exchange
        .list_instruments()
        .await
        .into_iter()
        .map(InstrumentResponse::from)
        .collect();
    Json(instruments)
}

pub async fn get_orderbook(
    State(exchange): State<Arc<Exchange>>,
    Path(ticker): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<impl IntoResponse> {
    validate_ticker(&ticker)?;
    let limit = query.limit.unwrap_or(DEFAULT_DEPTH_LIMIT).clamp(1, MAX_DEPTH_LIMIT);
    let snapshot = exchange.orderbook(&ticker, limit).await?;
    Ok(Json(OrderbookResponse::from(snapshot)))
}

pub async fn get_transactions(
    State(exchange): State<Arc<Exchange>>,
    Path(ticker): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<impl IntoResponse> {
    validate_ticker(&ticker)?;
    let limit = query.limit.unwrap_or(default_trade_limit()).clamp(1, max_trade_limit());
    let trades = exchange.trades(&ticker, limit).await?;
    let response: Vec<TradeResponse> = trades.into_iter().map(TradeResponse::from).collect();
    Ok(Json(response))
}

// ---- authenticated user routes ------------------------------------

pub async fn get_balance(
    State(exchange): State<Arc<Exchange>>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    let balances: BalanceResponse = exchange.balances_for_user(user.id).await;
    Json(balances)
}

pub async fn place_order(
    State(exchange): State<Arc<Exchange>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_ticker(&req.ticker)?;
    if is_quote_ticker(&req.ticker) {
        return Err(ApiError::Validation("RUB cannot be traded directly".to_string()));
    }
    if req.qty == 0 {
        return Err(ApiError::Validation("qty must be >= 1".to_string()));
    }

    let order = match req.price {
        Some(price) => {
            if price == 0 {
                return Err(ApiError::Validation("price must be >= 1".to_string()));
            }
            exchange
                .place_limit_order(user.id, req.ticker, req.direction, price, req.qty)
                .await?
        }
        None => {
            exchange
                .place_market_order(user.id, req.ticker, req.direction, req.qty)
                .await?
        }
    };

    Ok((
        StatusCode::OK,
        Json(PlaceOrderResponse { success: true, order_id: order.id }),
    ))
}

pub async fn list_orders(
    State(exchange): State<Arc<Exchange>>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    let orders: Vec<OrderResponse> = exchange
        .list_orders_for_user(user.id)
        .await
        .into_iter()
        .map(OrderResponse::from)
        .collect();
    Json(orders)
}

pub async fn get_order(
    State(exchange): State<Arc<Exchange>>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let order = exchange.get_order(order_id, user.id).await?;
    Ok(Json(OrderResponse::from(order)))
}

pub async fn cancel_order(
    State(exchange): State<Arc<Exchange>>,
    Extension(user): Extension<AuthUser>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    exchange.cancel_order(order_id, user.id).await?;
    Ok(Json(SuccessResponse::OK))
}

// ---- admin routes -----------------------------------------------------

pub async fn admin_deposit(
    State(exchange): State<Arc<Exchange>>,
    Json(req): Json<AdminBalanceRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_ticker(&req.ticker)?;
    if req.amount == 0 {
        return Err(ApiError::Validation("amount must be >= 1".to_string()));
    }
    exchange.admin_deposit(req.user_id, &req.ticker, req.amount).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn admin_withdraw(
    State(exchange): State<Arc<Exchange>>,
    Json(req): Json<AdminBalanceRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_ticker(&req.ticker)?;
    if req.amount == 0 {
        return Err(ApiError::Validation("amount must be >= 1".to_string()));
    }
    exchange.admin_withdraw(req.user_id, &req.ticker, req.amount).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn admin_create_instrument(
    State(exchange): State<Arc<Exchange>>,
    Json(req): Json<CreateInstrumentRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_ticker(&req.ticker)?;
    let instrument = exchange.create_instrument(req.ticker, req.name).await?;
    Ok((
        StatusCode::OK,
        Json(CreateInstrumentResponse { success: true, instrument: instrument.into() }),
    ))
}

pub async fn admin_delete_instrument(
    State(exchange): State<Arc<Exchange>>,
    Path(ticker): Path<String>,
) -> ApiResult<impl IntoResponse> {
    validate_ticker(&ticker)?;
    exchange.delete_instrument(&ticker).await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn admin_delete_user(
    State(exchange): State<Arc<Exchange>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let snapshot = exchange.delete_user(user_id).await?;
    Ok(Json(DeletedUserResponse::from(snapshot)))
}
