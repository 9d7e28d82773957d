// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! In-memory vault for testing.
//!
//! Stores safes and accounts in memory, supports error injection per
//! operation, and can hide freshly written accounts from a number of
//! subsequent reads to imitate the vault's read-after-write lag.
//!
//! ```
//! use pam_custom_provider::vault::mock::MockVault;
//! use pam_custom_provider::vault::{VaultClient, VaultConnector};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let vault = MockVault::new();
//! vault.insert_account("safe1", "acct1").await;
//!
//! let client = vault.connect().await.unwrap();
//! let accounts = client.get_accounts("safe1").await.unwrap();
//! assert_eq!(accounts.count, 1);
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::vault::models::{Account, AccountList, AddAccountRequest, AddSafeRequest, Safe};
use crate::vault::{VaultClient, VaultConnector, VaultError};

#[derive(Default)]
struct MockState {
    safes: Mutex<BTreeMap<String, Safe>>,
    accounts: Mutex<Vec<Account>>,
    /// Number of upcoming `get_accounts` calls that report an empty safe.
    stale_reads: Mutex<usize>,

    connect_error: Mutex<Option<VaultError>>,
    create_safe_error: Mutex<Option<VaultError>>,
    get_safe_error: Mutex<Option<VaultError>>,
    add_account_error: Mutex<Option<VaultError>>,
    get_accounts_error: Mutex<Option<VaultError>>,

    connect_calls: AtomicUsize,
    get_accounts_calls: AtomicUsize,
}

/// Mock vault. Clones share the same state.
#[derive(Clone, Default)]
pub struct MockVault {
    state: Arc<MockState>,
}

impl MockVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the vault with a safe.
    pub async fn insert_safe(&self, safe_name: &str, description: &str) {
        let mut safes = self.state.safes.lock().await;
        let safe = Safe {
            safe_url_id: safe_name.to_string(),
            safe_name: safe_name.to_string(),
            safe_number: Some(safes.len() as u64 + 1),
            description: Some(description.to_string()),
            ..Default::default()
        };
        safes.insert(safe_name.to_string(), safe);
    }

    /// Pre-populates the vault with an account.
    pub async fn insert_account(&self, safe_name: &str, account_name: &str) {
        let mut accounts = self.state.accounts.lock().await;
        let account = Account {
            id: format!("12_{}", accounts.len() + 1),
            name: account_name.to_string(),
            safe_name: Some(safe_name.to_string()),
            platform_id: Some("UnixSSH".to_string()),
            ..Default::default()
        };
        accounts.push(account);
    }

    /// Makes the next `count` account listings come back empty.
    pub async fn hide_accounts_for(&self, count: usize) {
        *self.state.stale_reads.lock().await = count;
    }

    pub async fn fail_connect(&self, error: VaultError) {
        *self.state.connect_error.lock().await = Some(error);
    }

    pub async fn fail_create_safe(&self, error: VaultError) {
        *self.state.create_safe_error.lock().await = Some(error);
    }

    pub async fn fail_get_safe(&self, error: VaultError) {
        *self.state.get_safe_error.lock().await = Some(error);
    }

    pub async fn fail_add_account(&self, error: VaultError) {
        *self.state.add_account_error.lock().await = Some(error);
    }

    pub async fn fail_get_accounts(&self, error: VaultError) {
        *self.state.get_accounts_error.lock().await = Some(error);
    }

    pub fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn get_accounts_calls(&self) -> usize {
        self.state.get_accounts_calls.load(Ordering::SeqCst)
    }
}

async fn injected(slot: &Mutex<Option<VaultError>>) -> Result<(), VaultError> {
    match slot.lock().await.as_ref() {
        Some(error) => Err(error.clone()),
        None => Ok(()),
    }
}

#[async_trait]
impl VaultConnector for MockVault {
    async fn connect(&self) -> Result<Arc<dyn VaultClient>, VaultError> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        injected(&self.state.connect_error).await?;
        Ok(Arc::new(self.clone()))
    }

    async fn refresh_session(&self) -> Result<(), VaultError> {
        injected(&self.state.connect_error).await
    }
}

#[async_trait]
impl VaultClient for MockVault {
    async fn create_safe(&self, request: &AddSafeRequest) -> Result<Safe, VaultError> {
        injected(&self.state.create_safe_error).await?;

        let mut safes = self.state.safes.lock().await;
        if safes.contains_key(&request.safe_name) {
            return Err(VaultError::Status {
                status: 409,
                message: format!("SFWS0012: Safe {} already exists.", request.safe_name),
            });
        }

        let safe = Safe {
            safe_url_id: request.safe_name.clone(),
            safe_name: request.safe_name.clone(),
            safe_number: Some(safes.len() as u64 + 1),
            description: Some(request.description.clone()),
            location: request.location.clone(),
            extra: request.extra.clone(),
        };
        safes.insert(request.safe_name.clone(), safe.clone());
        Ok(safe)
    }

    async fn get_safe_details(&self, safe_name: &str) -> Result<Safe, VaultError> {
        injected(&self.state.get_safe_error).await?;

        let safes = self.state.safes.lock().await;
        safes.get(safe_name).cloned().ok_or_else(|| VaultError::Status {
            status: 404,
            message: format!("SFWS0007: Safe {} was not found.", safe_name),
        })
    }

    async fn add_account(&self, request: &AddAccountRequest) -> Result<Account, VaultError> {
        injected(&self.state.add_account_error).await?;

        let mut accounts = self.state.accounts.lock().await;
        let name = request.name.clone().unwrap_or_else(|| {
            format!(
                "{}-{}-{}",
                request.platform_id,
                request.address.as_deref().unwrap_or_default(),
                request.user_name.as_deref().unwrap_or_default()
            )
        });
        let account = Account {
            id: format!("12_{}", accounts.len() + 1),
            name,
            address: request.address.clone(),
            user_name: request.user_name.clone(),
            platform_id: Some(request.platform_id.clone()),
            safe_name: Some(request.safe_name.clone()),
            secret_type: request.secret_type.clone(),
            created_time: Some(1_758_822_458),
            extra: BTreeMap::new(),
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn get_accounts(&self, safe_name: &str) -> Result<AccountList, VaultError> {
        self.state.get_accounts_calls.fetch_add(1, Ordering::SeqCst);
        injected(&self.state.get_accounts_error).await?;

        {
            let mut stale_reads = self.state.stale_reads.lock().await;
            if *stale_reads > 0 {
                *stale_reads -= 1;
                return Ok(AccountList::default());
            }
        }

        let accounts = self.state.accounts.lock().await;
        let value: Vec<Account> = accounts
            .iter()
            .filter(|account| account.safe_name.as_deref() == Some(safe_name))
            .cloned()
            .collect();
        Ok(AccountList {
            count: value.len() as u64,
            value,
            next_link: None,
        })
    }
}
