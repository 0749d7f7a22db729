// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inbound HTTP surface
//!
//! ```text
//! POST /push     X-Lizcel-Auth: <secret>
//!                config: {"domain":["sub","domain","tld"]}
//!                body: gzip(zip(site))
//! GET  /health
//! ```
//!
//! | Outcome            | Status |
//! |--------------------|--------|
//! | published          | 200    |
//! | no credential      | 401    |
//! | wrong credential   | 403    |
//! | invalid request    | 500    |
//! | staging / DNS      | 500    |
//!
//! Every 500 body is `Error processing the files: <message>`.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::AUTH_HEADER;
use crate::errors::DeployError;
use crate::service::{PublishCall, PublishService};

/// Request header carrying the JSON publish config
pub const CONFIG_HEADER: &str = "config";

#[derive(Clone)]
struct AppState {
    service: Arc<dyn PublishService>,
}

/// Build the service router
pub fn create_router(service: Arc<dyn PublishService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/push", post(push))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

async fn push(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, String), DeployError> {
    let call = PublishCall {
        credential: header(&headers, AUTH_HEADER),
        config: header(&headers, CONFIG_HEADER),
        payload: body,
    };

    let outcome = state.service.publish(call).await?;
    Ok((StatusCode::OK, outcome.message()))
}

async fn health() -> &'static str {
    "ok"
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        match &self {
            DeployError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            DeployError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()).into_response(),
            DeployError::InvalidRequest(_) | DeployError::Staging(_) | DeployError::Dns(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing the files: {}", self),
            )
                .into_response(),
        }
    }
}
