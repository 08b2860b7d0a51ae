//! Integration tests exercising the axum router end to end, in the
//! teacher's own `tower::ServiceExt::oneshot` integration-test style.
//!
//! Covers spec §8's concrete scenarios (simple cross, partial fill,
//! price improvement, market sweep, self-trade prevention, cancel refund)
//! through the HTTP surface rather than calling the engine directly.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use rub_exchange::api::router;
use rub_exchange::domain::services::Exchange;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &axum::Router, name: &str) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/v1/public/register")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "name": name }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn auth(builder: axum::http::request::Builder, api_key: &str) -> axum::http::request::Builder {
    builder.header("Authorization", format!("TOKEN {api_key}"))
}

/// Builds a test app plus one admin whose requests are pre-authorized,
/// bootstrapped the way a real deployment seeds its first admin account
/// out of band (spec §6 has no admin-registration route).
async fn setup() -> (axum::Router, String) {
    let exchange = Arc::new(Exchange::new());
    let admin = exchange.register_admin("root".to_string()).await;
    let app = router(exchange);
    (app, admin.api_key.to_string())
}

async fn create_instrument(app: &axum::Router, admin_key: &str, ticker: &str) {
    let response = app
        .clone()
        .oneshot(
            auth(Request::post("/api/v1/admin/instrument"), admin_key)
                .header("content-type", "application/json")
                .body(Body::from(json!({ "name": ticker, "ticker": ticker }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn deposit(app: &axum::Router, admin_key: &str, user_id: Uuid, ticker: &str, amount: u64) {
    let response = app
        .clone()
        .oneshot(
            auth(Request::post("/api/v1/admin/balance/deposit"), admin_key)
                .header("content-type", "application/json")
                .body(
                    Body::from(
                        json!({ "user_id": user_id, "ticker": ticker, "amount": amount }).to_string(),
                    ),
                )
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn place_order(app: &axum::Router, api_key: &str, payload: Value) -> Value {
    let response = app
        .clone()
        .oneshot(
            auth(Request::post("/api/v1/order"), api_key)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn balances_of(app: &axum::Router, api_key: &str) -> Value {
    let response = app
        .clone()
        .oneshot(
            auth(Request::get("/api/v1/balance"), api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn register_then_unauthenticated_routes_are_rejected() {
    let (app, _admin_key) = setup().await;
    let response = app
        .clone()
        .oneshot(Request::get("/api/v1/balance").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_api_key_is_unauthorized() {
    let (app, _admin_key) = setup().await;
    let response = app
        .clone()
        .oneshot(
            auth(Request::get("/api/v1/balance"), &Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_cannot_reach_admin_routes() {
    let (app, _admin_key) = setup().await;
    let user = register(&app, "alice").await;
    let response = app
        .clone()
        .oneshot(
            auth(Request::post("/api/v1/admin/instrument"), user["api_key"].as_str().unwrap())
                .header("content-type", "application/json")
                .body(Body::from(json!({"name": "Meme Coin", "ticker": "MEMCOIN"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_list_instruments_and_place_limit_order_round_trip() {
    let (app, admin_key) = setup().await;
    let user = register(&app, "alice").await;
    create_instrument(&app, &admin_key, "MEMCOIN").await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/public/instrument")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let instruments = body_json(response).await;
    assert_eq!(instruments[0]["ticker"], "MEMCOIN");

    let user_id: Uuid = user["id"].as_str().unwrap().parse().unwrap();
    deposit(&app, &admin_key, user_id, "RUB", 1000).await;

    let placed = place_order(
        &app,
        user["api_key"].as_str().unwrap(),
        json!({ "direction": "BUY", "ticker": "MEMCOIN", "qty": 5, "price": 100 }),
    )
    .await;
    assert_eq!(placed["success"], true);

    let order_id = placed["order_id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(
            auth(
                Request::get(format!("/api/v1/order/{order_id}")),
                user["api_key"].as_str().unwrap(),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = body_json(response).await;
    assert_eq!(order["status"], "NEW");
    assert_eq!(order["original_qty"], 5);
}

#[tokio::test]
async fn scenario_simple_cross_executes_both_sides() {
    let (app, admin_key) = setup().await;
    create_instrument(&app, &admin_key, "MEMCOIN").await;

    let a = register(&app, "A").await;
    let b = register(&app, "B").await;
    let a_id: Uuid = a["id"].as_str().unwrap().parse().unwrap();
    let b_id: Uuid = b["id"].as_str().unwrap().parse().unwrap();

    deposit(&app, &admin_key, a_id, "RUB", 1000).await;
    deposit(&app, &admin_key, b_id, "RUB", 1000).await;
    deposit(&app, &admin_key, b_id, "MEMCOIN", 10).await;

    place_order(
        &app,
        b["api_key"].as_str().unwrap(),
        json!({ "direction": "SELL", "ticker": "MEMCOIN", "qty": 5, "price": 100 }),
    )
    .await;
    let placed = place_order(
        &app,
        a["api_key"].as_str().unwrap(),
        json!({ "direction": "BUY", "ticker": "MEMCOIN", "qty": 5, "price": 100 }),
    )
    .await;
    assert_eq!(placed["success"], true);

    let a_balances = balances_of(&app, a["api_key"].as_str().unwrap()).await;
    assert_eq!(a_balances["RUB"], 500);
    assert_eq!(a_balances["MEMCOIN"], 5);
    let b_balances = balances_of(&app, b["api_key"].as_str().unwrap()).await;
    assert_eq!(b_balances["RUB"], 1500);
    assert_eq!(b_balances["MEMCOIN"], 5);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/public/transactions/MEMCOIN")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let trades = body_json(response).await;
    assert_eq!(trades.as_array().unwrap().len(), 1);
    assert_eq!(trades[0]["amount"], 5);
    assert_eq!(trades[0]["price"], 100);
}

#[tokio::test]
async fn insufficient_funds_rejects_with_400() {
    let (app, admin_key) = setup().await;
    create_instrument(&app, &admin_key, "MEMCOIN").await;
    let a = register(&app, "A").await;
    deposit(&app, &admin_key, a["id"].as_str().unwrap().parse().unwrap(), "RUB", 100).await;

    let response = app
        .clone()
        .oneshot(
            auth(Request::post("/api/v1/order"), a["api_key"].as_str().unwrap())
                .header("content-type", "application/json")
                .body(
                    Body::from(
                        json!({ "direction": "BUY", "ticker": "MEMCOIN", "qty": 10, "price": 100 })
                            .to_string(),
                    ),
                )
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scenario_cancel_refunds_remaining_reservation() {
    let (app, admin_key) = setup().await;
    create_instrument(&app, &admin_key, "MEMCOIN").await;
    let a = register(&app, "A").await;
    let a_id: Uuid = a["id"].as_str().unwrap().parse().unwrap();
    deposit(&app, &admin_key, a_id, "RUB", 1000).await;

    let placed = place_order(
        &app,
        a["api_key"].as_str().unwrap(),
        json!({ "direction": "BUY", "ticker": "MEMCOIN", "qty": 10, "price": 100 }),
    )
    .await;
    let order_id = placed["order_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            auth(
                Request::delete(format!("/api/v1/order/{order_id}")),
                a["api_key"].as_str().unwrap(),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let balances = balances_of(&app, a["api_key"].as_str().unwrap()).await;
    assert_eq!(balances["RUB"], 1000);

    // Cancelling again is an illegal state, not a second success.
    let response = app
        .clone()
        .oneshot(
            auth(
                Request::delete(format!("/api/v1/order/{order_id}")),
                a["api_key"].as_str().unwrap(),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scenario_market_sweep_consumes_multiple_levels() {
    let (app, admin_key) = setup().await;
    create_instrument(&app, &admin_key, "MEMCOIN").await;
    let buyer = register(&app, "buyer").await;
    let seller = register(&app, "seller").await;
    let seller_id: Uuid = seller["id"].as_str().unwrap().parse().unwrap();
    let buyer_id: Uuid = buyer["id"].as_str().unwrap().parse().unwrap();

    deposit(&app, &admin_key, seller_id, "MEMCOIN", 5).await;
    deposit(&app, &admin_key, buyer_id, "RUB", 1000).await;

    place_order(
        &app,
        seller["api_key"].as_str().unwrap(),
        json!({ "direction": "SELL", "ticker": "MEMCOIN", "qty": 2, "price": 100 }),
    )
    .await;
    place_order(
        &app,
        seller["api_key"].as_str().unwrap(),
        json!({ "direction": "SELL", "ticker": "MEMCOIN", "qty": 3, "price": 110 }),
    )
    .await;

    let placed = place_order(
        &app,
        buyer["api_key"].as_str().unwrap(),
        json!({ "direction": "BUY", "ticker": "MEMCOIN", "qty": 4 }),
    )
    .await;
    assert_eq!(placed["success"], true);

    let response = app
        .clone()
        .oneshot(
            Request::get("/api/v1/public/orderbook/MEMCOIN")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let book = body_json(response).await;
    assert_eq!(book["ask_levels"][0]["price"], 110);
    assert_eq!(book["ask_levels"][0]["qty"], 1);
}

#[tokio::test]
async fn self_trade_does_not_match_own_order() {
    let (app, admin_key) = setup().await;
    create_instrument(&app, &admin_key, "MEMCOIN").await;
    let user = register(&app, "solo").await;
    let user_id: Uuid = user["id"].as_str().unwrap().parse().unwrap();
    deposit(&app, &admin_key, user_id, "RUB", 1000).await;
    deposit(&app, &admin_key, user_id, "MEMCOIN", 5).await;

    place_order(
        &app,
        user["api_key"].as_str().unwrap(),
        json!({ "direction": "SELL", "ticker": "MEMCOIN", "qty": 5, "price": 100 }),
    )
    .await;
    let placed = place_order(
        &app,
        user["api_key"].as_str().unwrap(),
        json!({ "direction": "BUY", "ticker": "MEMCOIN", "qty": 5, "price": 100 }),
    )
    .await;
    let order_id = placed["order_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            auth(
                Request::get(format!("/api/v1/order/{order_id}")),
                user["api_key"].as_str().unwrap(),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    let order = body_json(response).await;
    assert_eq!(order["status"], "NEW");
}

#[tokio::test]
async fn admin_delete_user_returns_snapshot_with_balances() {
    let (app, admin_key) = setup().await;
    create_instrument(&app, &admin_key, "MEMCOIN").await;
    let user = register(&app, "alice").await;
    let user_id: Uuid = user["id"].as_str().unwrap().parse().unwrap();
    deposit(&app, &admin_key, user_id, "RUB", 500).await;

    let response = app
        .clone()
        .oneshot(
            auth(Request::delete(format!("/api/v1/admin/user/{user_id}")), &admin_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["id"], user_id.to_string());
    assert_eq!(snapshot["balances"]["RUB"]["amount"], 500);

    // The deleted user's key no longer authenticates.
    let response = app
        .clone()
        .oneshot(
            auth(Request::get("/api/v1/balance"), user["api_key"].as_str().unwrap())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_ticker_is_rejected_with_422() {
    let (app, admin_key) = setup().await;
    let response = app
        .clone()
        .oneshot(
            auth(Request::post("/api/v1/admin/instrument"), &admin_key)
                .header("content-type", "application/json")
                .body(Body::from(json!({"name": "bad", "ticker": "lowercase"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
