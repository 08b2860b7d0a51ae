//! Router assembly: public routes, authenticated user routes, and
//! admin-guarded routes (spec §6).
//!
//! Grounded on the teacher's `api::mod` (`AppState`, `Api::routes`, CORS
//! layer config), generalized to hold an `Arc<Exchange>` instead of a map
//! of matching engines directly, and to nest three route groups behind
//! [`auth::auth_middleware`] / [`auth::admin_guard`] rather than the
//! teacher's single flat, unauthenticated router.

pub mod auth;
pub mod dto;
pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::services::Exchange;

pub use error::{ApiError, ApiResult};

pub fn router(exchange: Arc<Exchange>) -> Router {
    let public = Router::new()
        .route("/public/register", post(routes::register))
        .route("/public/instrument", get(routes::list_instruments))
        .route("/public/orderbook/:ticker", get(routes::get_orderbook))
        .route("/public/transactions/:ticker", get(routes::get_transactions));

    let user = Router::new()
        .route("/balance", get(routes::get_balance))
        .route("/order", post(routes::place_order))
        .route("/order", get(routes::list_orders))
        .route("/order/:id", get(routes::get_order))
        .route("/order/:id", delete(routes::cancel_order))
        .layer(middleware::from_fn_with_state(exchange.clone(), auth::auth_middleware));

    let admin = Router::new()
        .route("/admin/balance/deposit", post(routes::admin_deposit))
        .route("/admin/balance/withdraw", post(routes::admin_withdraw))
        .route("/admin/instrument", post(routes::admin_create_instrument))
        .route("/admin/instrument/:ticker", delete(routes::admin_delete_instrument))
        .route("/admin/user/:id", delete(routes::admin_delete_user))
        .layer(middleware::from_fn(auth::admin_guard))
        .layer(middleware::from_fn_with_state(exchange.clone(), auth::auth_middleware));

    Router::new()
        .nest("/api/v1", public.merge(user).merge(admin))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(exchange)
}

pub async fn serve(addr: SocketAddr, exchange: Arc<Exchange>) -> std::io::Result<()> {
    let app = router(exchange);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "exchange listening");
    axum::serve(listener, app).await
}
