// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the custom provider.
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | GET | `/` (no routing header) | [`root`] | ARM discovery request |
//! | GET/PUT/DELETE | `/` (routing header) | [`root`] | Safe and account operations |
//! | GET | `/health` | [`health`] | Version, build date, configuration status |
//! | GET | `/healthex` | [`health_ex`] | Health plus vault session and public IP |
//! | any | anything else | [`catch_all`] | `404 EndpointNotFound` |
//!
//! ARM sends every resource request to `/` and names the resource in the
//! `X-Ms-Customproviders-Requestpath` header. [`root`] decodes it and
//! dispatches on the resource type:
//!
//! | Resource type | PUT | GET | DELETE |
//! |---------------|-----|-----|--------|
//! | `safes` | [`safes::create`] | [`safes::read`] | [`safes::delete`] |
//! | `accounts` | [`accounts::create`] | [`accounts::read`] | [`accounts::delete`] |
//!
//! Other resource types get `405 MethodNotAllowed`.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::accounts;
use crate::application::AppState;
use crate::constants::{
    ACCOUNTS_RESOURCE_TYPE, CORRELATION_ID_HEADER, PUBLIC_IP_TIMEOUT, REQUEST_DEADLINE,
    REQUEST_PATH_HEADER, SAFES_RESOURCE_TYPE, SERVICE_NAME,
};
use crate::errors::AppError;
use crate::models::HealthResponse;
use crate::request_path::ResourceAddress;
use crate::safes;

/// Discovery response.
///
/// ARM calls `GET /` before any create; this must answer without touching
/// the vault.
///
/// # Response
///
/// ```json
/// {"status": "ok"}
/// ```
pub async fn discovery() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Entry point for every request to `/`.
///
/// # Errors
///
/// - [`AppError::EndpointNotFound`] - no routing header on a non-GET request
/// - [`AppError::BadRequestPath`] - the routing header could not be decoded
/// - [`AppError::MethodNotAllowed`] - unsupported resource type
/// - anything the resource handlers return
#[tracing::instrument(skip(state, headers, body))]
pub async fn root(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request_path = headers
        .get(REQUEST_PATH_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .filter(|value| !value.trim().is_empty());

    let Some(request_path) = request_path else {
        if method == Method::GET {
            return Ok(discovery().await.into_response());
        }
        tracing::error!("[provider] unmatched request - method: {}, path: {}", method, uri.path());
        return Err(AppError::EndpointNotFound(uri.path().to_string()));
    };

    tracing::debug!(
        "[provider] custom provider request, correlation id: {:?}, request path: {}",
        headers.get(CORRELATION_ID_HEADER),
        request_path
    );

    let address = ResourceAddress::decode(&request_path).map_err(|e| {
        tracing::error!("[provider] could not decode request path ({}): {}", e.code(), e);
        AppError::from(e)
    })?;

    dispatch(&state, &method, uri.path(), &address, &body).await
}

/// Routes a decoded request to the resource handler for its type and verb.
///
/// Each request gets a cancellation token that fires at
/// [`REQUEST_DEADLINE`], before the timeout layer would discard the
/// response. Reconciliation polling stops there and the create still
/// answers with what the vault returned. The handler future also owns a
/// drop guard, so a client that goes away cancels the token too.
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    path: &str,
    address: &ResourceAddress,
    body: &[u8],
) -> Result<Response, AppError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    cancel_after(&cancel, REQUEST_DEADLINE);

    if address.is_resource_type(SAFES_RESOURCE_TYPE) {
        match *method {
            Method::PUT => safes::create(state, address, body).await,
            Method::GET => safes::read(state, address).await,
            Method::DELETE => safes::delete(address).await,
            _ => Err(AppError::EndpointNotFound(path.to_string())),
        }
    } else if address.is_resource_type(ACCOUNTS_RESOURCE_TYPE) {
        match *method {
            Method::PUT => accounts::create(state, address, body, &cancel).await,
            Method::GET => accounts::read(state, address).await,
            Method::DELETE => accounts::delete(address).await,
            _ => Err(AppError::EndpointNotFound(path.to_string())),
        }
    } else {
        tracing::warn!("[provider] unsupported resource type: {}", address.resource_type);
        Err(AppError::MethodNotAllowed(address.resource_type.clone()))
    }
}

/// Cancels `token` once `after` elapses, unless it is cancelled first.
fn cancel_after(token: &CancellationToken, after: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                tracing::warn!("[provider] request deadline of {:?} reached, cancelling", after);
                token.cancel();
            }
        }
    });
}

/// Health check endpoint.
///
/// Reports version, build date, and whether the vault settings are present.
/// Always answers `200`; a configuration problem shows up as
/// `"env_status": "error"`.
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let report = health_report(&state);
    tracing::info!(
        "[provider] health check - version: {}, build date: {}, env_status: {}",
        report.version,
        report.build_date,
        report.env_status
    );
    Json(report)
}

/// Extended health check.
///
/// Adds the container's public IP and the result of a forced vault
/// session refresh. Diagnostic only.
#[tracing::instrument(skip(state))]
pub async fn health_ex(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut report = health_report(&state);

    report.public_ip = Some(public_ip(&state.http, &state.options.public_ip_services).await);
    report.pam_client_check = Some(match state.vault.refresh_session().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::warn!("[provider] vault session refresh failed: {}", e);
            e.to_string()
        }
    });

    Json(report)
}

fn health_report(state: &AppState) -> HealthResponse {
    let env_error = state.options.validate().err().map(|e| {
        tracing::warn!("[provider] environment validation failed during health check: {}", e);
        e.to_string()
    });

    HealthResponse {
        version: state.build_info.version.clone(),
        build_date: state.build_info.build_date.clone(),
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        env_status: if env_error.is_some() { "error" } else { "ok" }.to_string(),
        env_error,
        public_ip: None,
        pam_client_check: None,
    }
}

/// Asks each service in turn for the caller's public IP; `unknown` if none answers.
async fn public_ip(http: &reqwest::Client, services: &[String]) -> String {
    for service in services {
        match http.get(service).timeout(PUBLIC_IP_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => {
                    let ip = body.trim().to_string();
                    tracing::debug!("[provider] got public IP {} from {}", ip, service);
                    return ip;
                }
                Err(e) => tracing::debug!("[provider] failed to read response from {}: {}", service, e),
            },
            Ok(response) => {
                tracing::debug!("[provider] {} returned {}", service, response.status())
            }
            Err(e) => tracing::debug!("[provider] failed to get IP from {}: {}", service, e),
        }
    }

    tracing::debug!("[provider] could not determine public IP from any service");
    "unknown".to_string()
}

/// Fallback for every request no route matched.
pub async fn catch_all(method: Method, uri: Uri) -> AppError {
    tracing::error!("[provider] unmatched request - method: {}, path: {}", method, uri.path());
    AppError::EndpointNotFound(uri.path().to_string())
}
