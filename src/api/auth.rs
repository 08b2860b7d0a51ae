//! `Authorization: TOKEN <api_key>` auth middleware and admin guard.
//!
//! Grounded on `leeleeEcho-polymarket-backend::auth::middleware::auth_middleware`
//! (header parse → lookup → insert request extension), adapted from
//! bearer-JWT to the static API-key scheme confirmed by
//! `original_source/wintochka/users/permissions.py::HasAPIKey` and
//! `users/utils.py::get_user_from_token` (one flat `Authorization` header,
//! no refresh/expiry semantics).

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::models::Role;
use crate::domain::services::Exchange;

#[derive(Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), StatusCode> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(StatusCode::FORBIDDEN)
        }
    }
}

fn parse_token(request: &Request<Body>) -> Option<Uuid> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    let key = header.strip_prefix("TOKEN ")?;
    Uuid::parse_str(key.trim()).ok()
}

pub async fn auth_middleware(
    State(exchange): State<Arc<Exchange>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let api_key = parse_token(&request).ok_or(StatusCode::UNAUTHORIZED)?;
    let user = exchange
        .authenticate(api_key)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthUser { id: user.id, role: user.role });
    Ok(next.run(request).await)
}

/// Second, thin middleware gating `/admin/*` routes on `AuthUser.role`.
/// Must run after [`auth_middleware`] in the layer stack, so it can assume
/// the extension is already present.
pub async fn admin_guard(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(StatusCode::UNAUTHORIZED)?;
    user.require_admin()?;
    Ok(next.run(request).await)
}
