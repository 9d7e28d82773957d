// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;
use std::time::Duration;

use clap::Parser;

use crate::constants::{REQUEST_DEADLINE, VAULT_REQUEST_TIMEOUT};
use crate::reconcile::RetryPolicy;
use crate::vault::VaultError;
use crate::vault::models::SecretString;

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ProviderOptions {
    #[arg(long, default_value = "0.0.0.0", env("HOST"))]
    pub host: String,
    #[arg(long, default_value = "8080", env("PORT"))]
    pub port: u16,
    /// Identity tenant URL, e.g. https://abc1234.id.cyberark.cloud
    #[arg(long, env("IDTENANTURL"))]
    pub id_tenant_url: Option<String>,
    /// Privilege Cloud URL, e.g. https://example.privilegecloud.cyberark.cloud
    #[arg(long, env("PCLOUDURL"))]
    pub pcloud_url: Option<String>,
    #[arg(long, env("PAMUSER"))]
    pub pam_user: Option<String>,
    #[arg(long, env("PAMPASS"), hide_env_values = true)]
    pub pam_pass: Option<String>,
    #[arg(long, default_value = "3", env("RECONCILE_ATTEMPTS"))]
    pub reconcile_attempts: u32,
    #[arg(long, default_value = "2000", env("RECONCILE_DELAY_MS"))]
    pub reconcile_delay_ms: u64,
    #[arg(long, default_value = "10", env("VAULT_TIMEOUT_SECS"))]
    pub vault_timeout_secs: u64,
    #[arg(
        long,
        env("PUBLIC_IP_SERVICES"),
        value_delimiter = ',',
        default_values = ["https://ipinfo.io/ip", "https://api.ipify.org", "https://icanhazip.com"]
    )]
    pub public_ip_services: Vec<String>,
}

/// Timing settings that would let a routed request outlive its deadline.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    #[error("reconcile budget of {attempts} x {delay:?} must stay under the {deadline:?} request deadline")]
    ReconcileBudget {
        attempts: u32,
        delay: Duration,
        deadline: Duration,
    },
    #[error("vault timeout of {timeout:?} lets a connect plus one vault call overrun the {deadline:?} request deadline")]
    VaultTimeout { timeout: Duration, deadline: Duration },
}

/// Vault settings once every required variable is known to be present.
pub struct VaultCredentials {
    pub id_tenant_url: String,
    pub pcloud_url: String,
    pub user: String,
    pub password: SecretString,
}

impl ProviderOptions {
    /// Checks the vault settings, naming every missing variable at once.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] listing the unset (or blank) variables.
    pub fn validate(&self) -> Result<VaultCredentials, VaultError> {
        let required = [
            ("IDTENANTURL", &self.id_tenant_url),
            ("PAMUSER", &self.pam_user),
            ("PAMPASS", &self.pam_pass),
            ("PCLOUDURL", &self.pcloud_url),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(VaultError::Config(format!(
                "missing required environment variables: [{}]",
                missing.join(", ")
            )));
        }

        Ok(VaultCredentials {
            id_tenant_url: self.id_tenant_url.clone().unwrap_or_default(),
            pcloud_url: self.pcloud_url.clone().unwrap_or_default(),
            user: self.pam_user.clone().unwrap_or_default(),
            password: SecretString::new(self.pam_pass.clone().unwrap_or_default()),
        })
    }

    /// Checks that post-create polling and the vault calls of one request
    /// fit inside [`REQUEST_DEADLINE`].
    ///
    /// # Errors
    ///
    /// Returns the first [`TimingError`] found.
    pub fn check_timing(&self) -> Result<(), TimingError> {
        let policy = self.retry_policy();
        if policy.delay.saturating_mul(policy.additional_attempts) >= REQUEST_DEADLINE {
            return Err(TimingError::ReconcileBudget {
                attempts: policy.additional_attempts,
                delay: policy.delay,
                deadline: REQUEST_DEADLINE,
            });
        }

        // connect (token login) followed by the resource call
        if self.vault_timeout().saturating_mul(2) > REQUEST_DEADLINE {
            return Err(TimingError::VaultTimeout {
                timeout: self.vault_timeout(),
                deadline: REQUEST_DEADLINE,
            });
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            additional_attempts: self.reconcile_attempts,
            delay: Duration::from_millis(self.reconcile_delay_ms),
        }
    }

    pub fn vault_timeout(&self) -> Duration {
        Duration::from_secs(self.vault_timeout_secs)
    }
}

// Custom Debug implementation to keep the vault password out of the logs
impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("id_tenant_url", &self.id_tenant_url)
            .field("pcloud_url", &self.pcloud_url)
            .field("pam_user", &self.pam_user)
            .field("pam_pass", &self.pam_pass.as_ref().map(|_| "[REDACTED]"))
            .field("reconcile_attempts", &self.reconcile_attempts)
            .field("reconcile_delay_ms", &self.reconcile_delay_ms)
            .field("vault_timeout_secs", &self.vault_timeout_secs)
            .field("public_ip_services", &self.public_ip_services)
            .finish()
    }
}

impl Default for ProviderOptions {
    fn default() -> Self {
        ProviderOptions {
            host: "127.0.0.1".to_string(),
            port: 8080,
            id_tenant_url: None,
            pcloud_url: None,
            pam_user: None,
            pam_pass: None,
            reconcile_attempts: 3,
            reconcile_delay_ms: 2000,
            vault_timeout_secs: VAULT_REQUEST_TIMEOUT.as_secs(),
            public_ip_services: Vec::new(),
        }
    }
}
