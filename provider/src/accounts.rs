// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Account resource handlers.
//!
//! Accounts are addressed as `{safeName}.{accountName}`: ARM instance names
//! are flat, while vault accounts live inside a safe.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::application::AppState;
use crate::constants::ACCOUNT_NAME_DELIMITER;
use crate::errors::AppError;
use crate::models::{AccountRequest, ProvisioningResponse};
use crate::reconcile::reconcile_account;
use crate::request_path::ResourceAddress;

/// An account instance name split at the first delimiter.
///
/// ```
/// use pam_custom_provider::accounts::CompositeAccountKey;
///
/// let key = CompositeAccountKey::parse("safe1.db.admin").unwrap();
/// assert_eq!(key.safe_name, "safe1");
/// assert_eq!(key.account_name, "db.admin");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeAccountKey<'a> {
    pub safe_name: &'a str,
    /// May be empty (`"safe1."`).
    pub account_name: &'a str,
}

impl<'a> CompositeAccountKey<'a> {
    /// # Errors
    ///
    /// [`AppError::ResourceNameMalformed`] if there is no delimiter or the
    /// safe part is empty.
    pub fn parse(resource_name: &'a str) -> Result<Self, AppError> {
        match resource_name.split_once(ACCOUNT_NAME_DELIMITER) {
            Some((safe_name, account_name)) if !safe_name.is_empty() => Ok(Self {
                safe_name,
                account_name,
            }),
            _ => {
                tracing::warn!("[provider] malformed account resource name: {}", resource_name);
                Err(AppError::ResourceNameMalformed(resource_name.to_string()))
            }
        }
    }
}

fn instance_name(address: &ResourceAddress) -> Result<&str, AppError> {
    address
        .resource_name
        .as_deref()
        .ok_or_else(|| AppError::ResourceNameMalformed(String::new()))
}

/// `PUT` on an account: adds it to the vault, waits for it to become
/// visible, and answers `201` with the vault's AddAccount response.
#[tracing::instrument(skip(state, address, body, cancel), fields(resource = %address))]
pub async fn create(
    state: &AppState,
    address: &ResourceAddress,
    body: &[u8],
    cancel: &CancellationToken,
) -> Result<Response, AppError> {
    let request: AccountRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("[provider] invalid account request body: {}", e);
        AppError::InvalidRequestBody(e.to_string())
    })?;
    request
        .validate()
        .map_err(|e| AppError::InvalidRequestBody(e.to_string()))?;

    let resource_name = instance_name(address)?;
    let key = CompositeAccountKey::parse(resource_name)?;
    if key.account_name.is_empty() {
        return Err(AppError::ResourceNameMalformed(resource_name.to_string()));
    }

    let client = state.vault_client().await?;

    let mut account = client.add_account(&request.properties).await.map_err(|e| {
        tracing::error!("[provider] failed to add account {}: {}", resource_name, e);
        AppError::AddAccount(e.to_string())
    })?;
    tracing::info!("[provider] added account {} with id {}", resource_name, account.id);

    let reconciliation = reconcile_account(
        client.as_ref(),
        &state.retry_policy(),
        cancel,
        key.safe_name,
        key.account_name,
    )
    .await;

    match &reconciliation.account {
        Some(found) => {
            tracing::info!(
                "[provider] account {} visible after {} attempts",
                resource_name,
                reconciliation.attempts
            );
            if account.id.is_empty() {
                account.id = found.id.clone();
            }
        }
        None => tracing::warn!(
            "[provider] account {} not visible after {} attempts ({:?})",
            resource_name,
            reconciliation.attempts,
            reconciliation.outcome
        ),
    }

    Ok((StatusCode::CREATED, Json(ProvisioningResponse::succeeded(address, account))).into_response())
}

/// `GET` on an account: one listing of the safe, matched by account name.
#[tracing::instrument(skip(state, address), fields(resource = %address))]
pub async fn read(state: &AppState, address: &ResourceAddress) -> Result<Response, AppError> {
    let resource_name = instance_name(address)?;
    let key = CompositeAccountKey::parse(resource_name)?;
    if key.account_name.is_empty() {
        return Err(AppError::ResourceNotFound(resource_name.to_string()));
    }

    let client = state.vault_client().await?;

    let accounts = client.get_accounts(key.safe_name).await.map_err(|e| {
        tracing::error!("[provider] failed to list accounts in safe {}: {}", key.safe_name, e);
        AppError::GetAccounts(e.to_string())
    })?;

    let Some(account) = accounts.find(key.account_name) else {
        tracing::debug!(
            "[provider] account {} not among {} accounts in safe {}",
            key.account_name,
            accounts.count,
            key.safe_name
        );
        return Err(AppError::ResourceNotFound(resource_name.to_string()));
    };

    Ok(Json(ProvisioningResponse::succeeded(address, account.clone())).into_response())
}

/// `DELETE` on an account. The vault integration has no delete operation.
pub async fn delete(address: &ResourceAddress) -> Result<Response, AppError> {
    tracing::warn!("[provider] delete requested for account {}, not supported", address.name());
    Err(AppError::AccountDeletion)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::to_bytes;
    use serde_json::json;
    use tokio::time::Instant;

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
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CustomProviders/resourceProviders/cp/accounts/{}",
            name
        )
        .parse()
        .unwrap()
    }

    fn account_body() -> String {
        json!({
            "properties": {
                "name": "acct1",
                "address": "10.0.0.5",
                "userName": "admin",
                "safeName": "safe1",
                "platformId": "UnixSSH",
                "secretType": "password",
                "secret": "hunter2"
            }
        })
        .to_string()
    }

    async fn json_of(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_composite_key_parsing() {
        let key = CompositeAccountKey::parse("safe1.acct1").unwrap();
        assert_eq!(key.safe_name, "safe1");
        assert_eq!(key.account_name, "acct1");

        let key = CompositeAccountKey::parse("safe1.").unwrap();
        assert_eq!(key.account_name, "");

        assert_eq!(
            CompositeAccountKey::parse("safe1").unwrap_err(),
            AppError::ResourceNameMalformed("safe1".to_string())
        );
        assert!(CompositeAccountKey::parse(".acct1").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_account_waits_for_visibility() {
        let vault = MockVault::new();
        vault.hide_accounts_for(2).await;
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let response = create(&state(&vault), &address("safe1.acct1"), account_body().as_bytes(), &cancel)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(vault.get_accounts_calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));

        let json = json_of(response).await;
        assert_eq!(json["name"], "safe1.acct1");
        assert_eq!(json["properties"]["id"], "12_1");
        assert_eq!(json["properties"]["safeName"], "safe1");
        assert_eq!(json["properties"]["provisioningState"], "Succeeded");
        assert!(json["properties"].get("secret").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_account_succeeds_when_never_visible() {
        let vault = MockVault::new();
        vault.hide_accounts_for(10).await;
        let cancel = CancellationToken::new();

        let response = create(&state(&vault), &address("safe1.acct1"), account_body().as_bytes(), &cancel)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(vault.get_accounts_calls(), 4);
    }

    #[tokio::test]
    async fn test_create_account_stops_polling_when_cancelled() {
        let vault = MockVault::new();
        vault.hide_accounts_for(10).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let response = create(&state(&vault), &address("safe1.acct1"), account_body().as_bytes(), &cancel)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(vault.get_accounts_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_account_validation() {
        let vault = MockVault::new();
        let cancel = CancellationToken::new();

        let missing_platform = json!({"properties": {"name": "acct1", "safeName": "safe1"}}).to_string();
        let err = create(&state(&vault), &address("safe1.acct1"), missing_platform.as_bytes(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "InvalidRequestBody");
        assert!(err.to_string().contains("platformId is not set"));

        let err = create(&state(&vault), &address("safe1.acct1"), b"{", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = create(&state(&vault), &address("acct1"), account_body().as_bytes(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ResourceNameMalformed");

        let err = create(&state(&vault), &address("safe1."), account_body().as_bytes(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ResourceNameMalformed");

        assert_eq!(vault.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_account_vault_failure() {
        let vault = MockVault::new();
        vault
            .fail_add_account(VaultError::Status {
                status: 400,
                message: "PASWS027E: The platform UnixSSH does not exist".to_string(),
            })
            .await;
        let cancel = CancellationToken::new();

        let err = create(&state(&vault), &address("safe1.acct1"), account_body().as_bytes(), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "AddAccountError");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "failed to add account: vault returned status 400: PASWS027E: The platform UnixSSH does not exist"
        );
        assert_eq!(vault.get_accounts_calls(), 0);
    }

    #[tokio::test]
    async fn test_read_account() {
        let vault = MockVault::new();
        vault.insert_account("safe1", "other").await;
        vault.insert_account("safe1", "acct1").await;

        let response = read(&state(&vault), &address("safe1.acct1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["properties"]["id"], "12_2");
        assert_eq!(json["properties"]["name"], "acct1");
        assert_eq!(vault.get_accounts_calls(), 1);
    }

    #[tokio::test]
    async fn test_read_account_not_found() {
        let vault = MockVault::new();
        vault.insert_account("safe1", "other").await;

        let err = read(&state(&vault), &address("safe1.acct1")).await.unwrap_err();
        assert_eq!(err, AppError::ResourceNotFound("safe1.acct1".to_string()));

        let err = read(&state(&vault), &address("empty.acct1")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_read_empty_account_name_skips_vault() {
        let vault = MockVault::new();

        let err = read(&state(&vault), &address("safe1.")).await.unwrap_err();

        assert_eq!(err.code(), "ResourceNotFound");
        assert_eq!(vault.connect_calls(), 0);
        assert_eq!(vault.get_accounts_calls(), 0);
    }

    #[tokio::test]
    async fn test_read_account_vault_failure() {
        let vault = MockVault::new();
        vault
            .fail_get_accounts(VaultError::Transport("connection reset".to_string()))
            .await;

        let err = read(&state(&vault), &address("safe1.acct1")).await.unwrap_err();

        assert_eq!(err.code(), "GetAccountsError");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_delete_account_not_implemented() {
        let err = delete(&address("safe1.acct1")).await.unwrap_err();
        assert_eq!(err.code(), "AccountDeletionError");
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
