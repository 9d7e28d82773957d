// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use crate::configuration::ProviderOptions;
use crate::constants::{MAX_REQUEST_BODY_SIZE, REQUEST_TIMEOUT};
use crate::errors::AppError;
use crate::models::BuildInfo;
use crate::reconcile::RetryPolicy;
use crate::routes;
use crate::vault::{VaultClient, VaultConnector};
use axum::Router;
use axum::http::StatusCode;
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::serve::Serve;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub options: ProviderOptions,
    pub build_info: BuildInfo,
    pub vault: Arc<dyn VaultConnector>,
    /// Client for diagnostics outside the vault (public IP lookup).
    pub http: reqwest::Client,
}

impl AppState {
    /// Connects to the vault, mapping any failure to `PAMClientError`.
    pub async fn vault_client(&self) -> Result<Arc<dyn VaultClient>, AppError> {
        self.vault.connect().await.map_err(|e| {
            tracing::error!("[provider] failed to create PAM client: {}", e);
            AppError::PamClient(e.to_string())
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.options.retry_policy()
    }
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(
        options: ProviderOptions,
        build_info: BuildInfo,
        vault: Arc<dyn VaultConnector>,
    ) -> Result<Self, std::io::Error> {
        let address = format!("{}:{}", options.host, options.port);
        let listener = TcpListener::bind(address).await?;
        let host = options.host.clone();
        let server = run(listener, create_router(options, build_info, vault))?;
        let port = server.local_addr()?.port();

        tracing::info!("[provider] listening at http://{}:{}", host, port);

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Builds the router with production middleware (tracing, body limit, timeout).
///
/// Every resource request arrives at `/`; the routing header decides the rest.
pub fn create_router(
    options: ProviderOptions,
    build_info: BuildInfo,
    vault: Arc<dyn VaultConnector>,
) -> Router {
    let state = Arc::new(AppState {
        options,
        build_info,
        vault,
        http: reqwest::Client::new(),
    });

    Router::new()
        .route(
            "/",
            get(routes::root)
                .put(routes::root)
                .delete(routes::root)
                .fallback(routes::catch_all),
        )
        .route("/health", get(routes::health).fallback(routes::catch_all))
        .route("/healthex", get(routes::health_ex).fallback(routes::catch_all))
        .fallback(routes::catch_all)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
        .layer(map_response(envelope_middleware_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Gives timeout and body-limit rejections the same `{"error": ...}` body
/// as every other failure. No handler answers 408 or 413 itself.
async fn envelope_middleware_errors(response: Response) -> Response {
    match response.status() {
        StatusCode::REQUEST_TIMEOUT => {
            tracing::warn!("[provider] request timed out after {:?}", REQUEST_TIMEOUT);
            AppError::RequestTimeout(REQUEST_TIMEOUT).into_response()
        }
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(MAX_REQUEST_BODY_SIZE).into_response(),
        _ => response,
    }
}

pub fn run(listener: TcpListener, app: Router) -> Result<Serve<TcpListener, Router, Router>, std::io::Error> {
    Ok(axum::serve(listener, app))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_timeout_rejection_gets_error_envelope() {
        let rejected = (StatusCode::REQUEST_TIMEOUT, Body::empty()).into_response();

        let response = envelope_middleware_errors(rejected).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "RequestTimeout");
        assert_eq!(json["error"]["message"], "request did not complete within 30s");
    }

    #[tokio::test]
    async fn test_body_limit_rejection_gets_error_envelope() {
        let rejected = (StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded").into_response();

        let response = envelope_middleware_errors(rejected).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = json_of(response).await;
        assert_eq!(json["error"]["code"], "PayloadTooLarge");
        assert_eq!(json["error"]["message"], "request body exceeds 1048576 bytes");
    }

    #[tokio::test]
    async fn test_other_responses_pass_through() {
        let created = (StatusCode::CREATED, "{}").into_response();

        let response = envelope_middleware_errors(created).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{}");
    }
}
