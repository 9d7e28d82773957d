// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Safe resource handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use validator::Validate;

use crate::application::AppState;
use crate::errors::AppError;
use crate::models::{ProvisioningResponse, SafeProperties, SafeRequest};
use crate::request_path::ResourceAddress;

/// `PUT` on a safe: creates it in the vault and answers `201`.
#[tracing::instrument(skip(state, address, body), fields(resource = %address))]
pub async fn create(state: &AppState, address: &ResourceAddress, body: &[u8]) -> Result<Response, AppError> {
    let request: SafeRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("[provider] invalid safe request body: {}", e);
        AppError::InvalidRequestBody(e.to_string())
    })?;
    request
        .validate()
        .map_err(|e| AppError::InvalidRequestBody(e.to_string()))?;

    let client = state.vault_client().await?;

    let safe_name = request.properties.safe_name.clone();
    let description = request.properties.description.clone();
    tracing::info!("[provider] creating safe {}", safe_name);

    let safe = client
        .create_safe(&request.properties.into())
        .await
        .map_err(|e| {
            tracing::error!("[provider] failed to create safe {}: {}", safe_name, e);
            AppError::SafeCreation(e.to_string())
        })?;

    tracing::info!("[provider] created safe {} with id {}", safe_name, safe.safe_url_id);

    let properties = SafeProperties {
        safe_name,
        safe_id: safe.safe_url_id,
        description,
    };

    Ok((
        StatusCode::CREATED,
        Json(ProvisioningResponse::succeeded(address, properties)),
    )
        .into_response())
}

/// `GET` on a safe: reports the vault's view of it.
#[tracing::instrument(skip(state, address), fields(resource = %address))]
pub async fn read(state: &AppState, address: &ResourceAddress) -> Result<Response, AppError> {
    let Some(safe_name) = address.resource_name.as_deref() else {
        return Err(AppError::ResourceNotFound(address.encode()));
    };

    let client = state.vault_client().await?;

    let safe = client.get_safe_details(safe_name).await.map_err(|e| {
        tracing::error!("[provider] failed to get safe {}: {}", safe_name, e);
        if e.is_not_found() {
            AppError::SafeNotFound {
                status: 404,
                name: safe_name.to_string(),
            }
        } else {
            AppError::GetSafeDetails {
                status: e.status().unwrap_or(500),
                message: e.to_string(),
            }
        }
    })?;

    Ok(Json(ProvisioningResponse::succeeded(address, SafeProperties::from(safe))).into_response())
}

/// `DELETE` on a safe. The vault integration has no delete operation.
pub async fn delete(address: &ResourceAddress) -> Result<Response, AppError> {
    tracing::warn!("[provider] delete requested for safe {}, not supported", address.name());
    Err(AppError::SafeDeletion)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use serde_json::json;

    use crate::configuration::ProviderOptions;
    use crate::models::BuildInfo;
    use crate::vault::VaultError;
    use crate::vault::mock::MockVault;

    fn state(vault: &MockVault) -> AppState {
        AppState {
            options: ProviderOptions::default(),
            build_info: BuildInfo::new("test", "test"),
            vault: Arc::new(vault.clone()),
            http: reqwest::Client::new(),
        }
    }

    fn address(name: &str) -> ResourceAddress {
        format!(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CustomProviders/resourceProviders/cp/safes/{}",
            name
        )
        .parse()
        .unwrap()
    }

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_create_safe() {
        let vault = MockVault::new();
        let body = json!({"properties": {"safeName": "safe1", "description": "test safe"}});

        let response = create(&state(&vault), &address("safe1"), body.to_string().as_bytes())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_of(response).await;
        assert_eq!(json["name"], "safe1");
        assert_eq!(json["type"], "Microsoft.CustomProviders/resourceProviders/safes");
        assert_eq!(json["properties"]["safeName"], "safe1");
        assert_eq!(json["properties"]["safeID"], "safe1");
        assert_eq!(json["properties"]["description"], "test safe");
        assert_eq!(json["properties"]["provisioningState"], "Succeeded");
    }

    #[tokio::test]
    async fn test_create_safe_rejects_bad_body_before_connecting() {
        let vault = MockVault::new();

        let err = create(&state(&vault), &address("safe1"), b"not json").await.unwrap_err();
        assert_eq!(err.code(), "InvalidRequestBody");

        let empty_name = json!({"properties": {"safeName": ""}}).to_string();
        let err = create(&state(&vault), &address("safe1"), empty_name.as_bytes())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        assert_eq!(vault.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_safe_vault_failure() {
        let vault = MockVault::new();
        vault.insert_safe("safe1", "existing").await;
        let body = json!({"properties": {"safeName": "safe1"}}).to_string();

        let err = create(&state(&vault), &address("safe1"), body.as_bytes()).await.unwrap_err();

        assert_eq!(err.code(), "SafeCreationError");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_safe_vault_unavailable() {
        let vault = MockVault::new();
        vault
            .fail_create_safe(VaultError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            })
            .await;
        let body = json!({"properties": {"safeName": "safe2"}}).to_string();

        let err = create(&state(&vault), &address("safe2"), body.as_bytes()).await.unwrap_err();

        assert_eq!(
            err,
            AppError::SafeCreation("vault returned status 503: service unavailable".to_string())
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_create_safe_connect_failure() {
        let vault = MockVault::new();
        vault
            .fail_connect(VaultError::Config("missing required environment variables: [PAMPASS]".to_string()))
            .await;
        let body = json!({"properties": {"safeName": "safe1"}}).to_string();

        let err = create(&state(&vault), &address("safe1"), body.as_bytes()).await.unwrap_err();

        assert_eq!(err.code(), "PAMClientError");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_read_safe() {
        let vault = MockVault::new();
        vault.insert_safe("safe1", "payments").await;

        let response = read(&state(&vault), &address("safe1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["properties"]["safeID"], "safe1");
        assert_eq!(json["properties"]["description"], "payments");
        assert_eq!(json["properties"]["provisioningState"], "Succeeded");
    }

    #[tokio::test]
    async fn test_read_missing_safe_keeps_vault_status() {
        let vault = MockVault::new();

        let err = read(&state(&vault), &address("nope")).await.unwrap_err();
        assert_eq!(
            err,
            AppError::SafeNotFound {
                status: 404,
                name: "nope".to_string()
            }
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        vault
            .fail_get_safe(VaultError::Status {
                status: 403,
                message: "forbidden".to_string(),
            })
            .await;
        let err = read(&state(&vault), &address("safe1")).await.unwrap_err();
        assert_eq!(err.code(), "GetSafeDetailsError");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_read_without_instance_name() {
        let vault = MockVault::new();
        let address: ResourceAddress =
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CustomProviders/resourceProviders/cp/safes"
                .parse()
                .unwrap();

        let err = read(&state(&vault), &address).await.unwrap_err();

        assert_eq!(err.code(), "ResourceNotFound");
        assert_eq!(vault.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_safe_not_implemented() {
        let err = delete(&address("safe1")).await.unwrap_err();
        assert_eq!(err, AppError::SafeDeletion);
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
