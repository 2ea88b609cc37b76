//! Session endpoints: login, register, logout, current user, profile and password reset.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::{json_body, relay, ProxyResult};
use crate::errors::AppError;
use crate::metrics::MetricKind;
use crate::proxy::{ForwardRequest, RelayPolicy};
use crate::AppState;

const SESSION_FAILURE: &str = "Internal server error";

/// POST /login - Forward credentials and relay the session cookie.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    let request = ForwardRequest::post("/login")
        .cookies_from(&headers)
        .json(body);
    relay(&state, request, RelayPolicy::Verbatim, SESSION_FAILURE).await
}

/// POST /register - Forward the new account and relay the session cookie.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    let request = ForwardRequest::post("/register")
        .cookies_from(&headers)
        .json(body);
    relay(&state, request, RelayPolicy::Verbatim, SESSION_FAILURE).await
}

/// POST /logout - Forward the session cookie and relay the cleared one.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ProxyResult {
    let request = ForwardRequest::post("/logout").cookies_from(&headers);
    relay(&state, request, RelayPolicy::Verbatim, SESSION_FAILURE).await
}

/// GET /user - The current user, or `null` when there is no session.
///
/// An upstream 401 is "not signed in", not a failure.
pub async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let request = ForwardRequest::get("/user").cookies_from(&headers);
    let response = relay(&state, request, RelayPolicy::Verbatim, "Failed to fetch user").await?;

    if response.status == StatusCode::UNAUTHORIZED {
        return Ok((StatusCode::OK, Json(Value::Null)).into_response());
    }

    let response = response.apply(RelayPolicy::RequireSuccess).map_err(|err| {
        state.metrics.record(MetricKind::Error, 1);
        err.with_upstream_message("Failed to fetch user")
    })?;
    Ok(response.into_response())
}

/// GET /api/profile - The signed-in user's profile.
pub async fn profile(State(state): State<AppState>, headers: HeaderMap) -> ProxyResult {
    let request = ForwardRequest::get("/api/profile").cookies_from(&headers);
    relay(&state, request, RelayPolicy::Verbatim, "Failed to fetch profile").await
}

/// POST /api/reset-password - Change the signed-in user's password.
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ProxyResult {
    let body = json_body(body)?;
    let request = ForwardRequest::post("/api/reset-password")
        .cookies_from(&headers)
        .json(body);
    relay(&state, request, RelayPolicy::Verbatim, SESSION_FAILURE).await
}
