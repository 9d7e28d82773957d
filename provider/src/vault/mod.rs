// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Boundary to the PAM vault.
//!
//! The handlers only see two traits:
//!
//! - [`VaultConnector`] validates configuration and hands out a client bound
//!   to a live session. It is shared across requests.
//! - [`VaultClient`] performs the four vault operations the provider needs.
//!
//! [`pam::PamConnector`] talks to the Privilege Cloud REST API. With the
//! `mock` feature, [`mock::MockVault`] provides an in-memory vault for tests.

use std::sync::Arc;

use async_trait::async_trait;

pub mod models;
pub mod pam;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use models::{Account, AccountList, AddAccountRequest, AddSafeRequest, Safe};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("could not refresh session: {0}")]
    Session(String),
    #[error("vault returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("vault request failed: {0}")]
    Transport(String),
    #[error("invalid vault response: {0}")]
    Decode(String),
}

impl VaultError {
    /// HTTP status reported by the vault, if the call got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(source: reqwest::Error) -> Self {
        tracing::error!("{:?}", source);
        if source.is_decode() {
            VaultError::Decode(source.to_string())
        } else {
            VaultError::Transport(source.to_string())
        }
    }
}

/// Operations the provider performs against the vault.
///
/// Every call is attempted once; retry policy belongs to the caller.
#[async_trait]
pub trait VaultClient: Send + Sync {
    /// Creates a safe and returns the vault's view of it (including `safeUrlId`).
    async fn create_safe(&self, request: &AddSafeRequest) -> Result<Safe, VaultError>;

    /// Looks up a safe by name. A missing safe is a `Status { status: 404, .. }`.
    async fn get_safe_details(&self, safe_name: &str) -> Result<Safe, VaultError>;

    async fn add_account(&self, request: &AddAccountRequest) -> Result<Account, VaultError>;

    /// Lists the accounts stored in `safe_name`.
    async fn get_accounts(&self, safe_name: &str) -> Result<AccountList, VaultError>;
}

#[async_trait]
pub trait VaultConnector: Send + Sync {
    /// Validates configuration and returns a client with a usable session.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if a required setting is missing
    /// - [`VaultError::Session`] if authentication against the identity tenant fails
    async fn connect(&self) -> Result<Arc<dyn VaultClient>, VaultError>;

    /// Discards any cached session and authenticates again.
    async fn refresh_session(&self) -> Result<(), VaultError>;
}
