// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Privilege Cloud implementation of the vault boundary.
//!
//! Sessions are platform tokens issued by the identity tenant
//! (`POST {IDTENANTURL}/oauth2/platformtoken`). The token is cached and
//! refreshed [`SESSION_REFRESH_BUFFER`] before it expires; every vault call
//! carries it as a bearer token to `{PCLOUDURL}/PasswordVault/API`.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::configuration::{ProviderOptions, VaultCredentials};
use crate::constants::{PAM_API_PATH, PLATFORM_TOKEN_PATH, SERVICE_NAME, SESSION_REFRESH_BUFFER};
use crate::vault::models::{
    Account, AccountList, AddAccountRequest, AddSafeRequest, PamErrorBody, PlatformToken, Safe,
    SecretString,
};
use crate::vault::{VaultClient, VaultConnector, VaultError};

struct CachedSession {
    token: SecretString,
    expires_at: Option<Instant>,
}

pub struct PamConnector {
    options: ProviderOptions,
    http: Client,
    session: RwLock<Option<CachedSession>>,
}

impl PamConnector {
    /// Builds the connector. Configuration is checked on every
    /// [`connect`](VaultConnector::connect), not here.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if the HTTP client cannot be built.
    pub fn new(options: ProviderOptions) -> Result<Self, VaultError> {
        let http = Client::builder()
            .timeout(options.vault_timeout())
            .user_agent(format!("{}/{}", SERVICE_NAME, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VaultError::Config(e.to_string()))?;

        Ok(Self::with_client(options, http))
    }

    /// Builds the connector around an existing HTTP client.
    pub fn with_client(options: ProviderOptions, http: Client) -> Self {
        Self {
            options,
            http,
            session: RwLock::new(None),
        }
    }

    /// Returns the cached token if valid, otherwise logs in again
    async fn session_token(&self, credentials: &VaultCredentials) -> Result<SecretString, VaultError> {
        // Fast path: check if the cached session is still valid
        {
            let cache = self.session.read().await;
            if let Some(ref cached) = *cache
                && is_valid(cached)
            {
                return Ok(cached.token.clone());
            }
        }

        // Slow path: refresh the session
        let mut cache = self.session.write().await;

        // Double-check after acquiring write lock (another request may have refreshed)
        if let Some(ref cached) = *cache
            && is_valid(cached)
        {
            return Ok(cached.token.clone());
        }

        let session = self.login(credentials).await?;
        let token = session.token.clone();
        *cache = Some(session);

        Ok(token)
    }

    #[tracing::instrument(skip(self, credentials), fields(user = %credentials.user))]
    async fn login(&self, credentials: &VaultCredentials) -> Result<CachedSession, VaultError> {
        let url = format!(
            "{}/{}",
            credentials.id_tenant_url.trim_end_matches('/'),
            PLATFORM_TOKEN_PATH
        );

        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.user.as_str()),
                ("client_secret", credentials.password.expose()),
            ])
            .send()
            .await
            .map_err(|e| VaultError::Session(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Session(format!("identity tenant returned {}: {}", status, body)));
        }

        let token: PlatformToken = response
            .json()
            .await
            .map_err(|e| VaultError::Session(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(VaultError::Session("identity tenant returned an empty token".to_string()));
        }

        let expires_at = token
            .expires_in
            .and_then(|secs| Instant::now().checked_add(std::time::Duration::from_secs(secs)));

        tracing::debug!("[provider] refreshed vault session, expires_at: {:?}", expires_at);

        Ok(CachedSession {
            token: token.access_token.clone(),
            expires_at,
        })
    }
}

fn is_valid(cached: &CachedSession) -> bool {
    match cached.expires_at {
        Some(expires_at) => Instant::now()
            .checked_add(SESSION_REFRESH_BUFFER)
            .is_some_and(|threshold| threshold < expires_at),
        None => true, // No expiry = always valid
    }
}

#[async_trait]
impl VaultConnector for PamConnector {
    async fn connect(&self) -> Result<Arc<dyn VaultClient>, VaultError> {
        let credentials = self.options.validate()?;
        let token = self.session_token(&credentials).await?;

        Ok(Arc::new(PamClient {
            http: self.http.clone(),
            api_url: format!("{}/{}", credentials.pcloud_url.trim_end_matches('/'), PAM_API_PATH),
            token,
        }))
    }

    async fn refresh_session(&self) -> Result<(), VaultError> {
        let credentials = self.options.validate()?;
        let mut cache = self.session.write().await;
        *cache = Some(self.login(&credentials).await?);
        Ok(())
    }
}

/// A Privilege Cloud client bound to one session token.
pub struct PamClient {
    http: Client,
    api_url: String,
    token: SecretString,
}

impl PamClient {
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, VaultError> {
        let response = request.bearer_auth(self.token.expose()).send().await?;

        let status = response.status();
        tracing::debug!("[provider] vault responded with status {}", status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Prefers the vault's `ErrorCode: ErrorMessage` pair over the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<PamErrorBody>(body) {
        Ok(error) if !error.error_message.is_empty() => {
            format!("{}: {}", error.error_code, error.error_message)
        }
        _ => body.to_string(),
    }
}

#[async_trait]
impl VaultClient for PamClient {
    #[tracing::instrument(skip(self, request), fields(safe_name = %request.safe_name))]
    async fn create_safe(&self, request: &AddSafeRequest) -> Result<Safe, VaultError> {
        let url = format!("{}/Safes", self.api_url);
        self.send(self.http.post(url).json(request)).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_safe_details(&self, safe_name: &str) -> Result<Safe, VaultError> {
        let url = format!("{}/Safes/{}", self.api_url, urlencoding::encode(safe_name));
        self.send(self.http.get(url)).await
    }

    #[tracing::instrument(skip(self, request), fields(safe_name = %request.safe_name))]
    async fn add_account(&self, request: &AddAccountRequest) -> Result<Account, VaultError> {
        let url = format!("{}/Accounts", self.api_url);
        self.send(self.http.post(url).json(request)).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_accounts(&self, safe_name: &str) -> Result<AccountList, VaultError> {
        let url = format!("{}/Accounts", self.api_url);
        let filter = format!("safeName eq {}", safe_name);
        self.send(self.http.get(url).query(&[("filter", filter)])).await
    }
}
