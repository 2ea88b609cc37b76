//! Proxy API module.
//!
//! One handler per browser-facing endpoint. Each handler builds a
//! [`ForwardRequest`], relays it through [`relay`] and hands the backend's
//! answer back unchanged or as a generic failure, depending on the route.

mod auth;
mod metrics;
mod movies;
mod ratings;

pub use auth::*;
pub use metrics::*;
pub use movies::*;
pub use ratings::*;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Json,
};

use crate::errors::AppError;
use crate::metrics::MetricKind;
use crate::proxy::{ForwardRequest, RelayPolicy, UpstreamResponse};
use crate::AppState;

/// Result type of every proxy handler.
pub type ProxyResult = Result<UpstreamResponse, AppError>;

/// Forward one request and apply the route's relay policy.
///
/// `failure` is the message the caller sees if the backend cannot be used.
pub(crate) async fn relay(
    state: &AppState,
    request: ForwardRequest,
    policy: RelayPolicy,
    failure: &str,
) -> ProxyResult {
    state.metrics.record(MetricKind::ApiCall, 1);
    let path = request.path().to_string();

    state
        .upstream
        .send(request)
        .await
        .and_then(|response| response.apply(policy))
        .map_err(|err| {
            tracing::error!("Proxy error on {}: {}", path, err);
            state.metrics.record(MetricKind::Error, 1);
            err.with_upstream_message(failure)
        })
}

/// Unwrap an inbound JSON body, answering 400 if it does not parse.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// Unwrap query parameters, answering 400 with the usual error body if they do not parse.
pub(crate) fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    match params {
        Ok(Query(value)) => Ok(value),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}
