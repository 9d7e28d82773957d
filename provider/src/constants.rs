// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

/// Header ARM injects on every custom-provider proxy request.
pub const REQUEST_PATH_HEADER: &str = "x-ms-customproviders-requestpath";
pub const CORRELATION_ID_HEADER: &str = "x-ms-correlation-request-id";

/// Minimum number of segments in a routing header (no instance name).
pub const MIN_PATH_SEGMENTS: usize = 9;

pub const CUSTOM_PROVIDER_TYPE_PREFIX: &str = "Microsoft.CustomProviders/resourceProviders";
pub const SAFES_RESOURCE_TYPE: &str = "safes";
pub const ACCOUNTS_RESOURCE_TYPE: &str = "accounts";

/// Dot is invalid in safe names, so the first one splits `{safe}.{account}`.
pub const ACCOUNT_NAME_DELIMITER: char = '.';

pub const SERVICE_NAME: &str = "pam-custom-provider";

// Read-after-write settling for newly added accounts
pub const RECONCILE_ADDITIONAL_ATTEMPTS: u32 = 3;
pub const RECONCILE_DELAY: Duration = Duration::from_secs(2);

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Routed requests cancel their token here, ahead of [`REQUEST_TIMEOUT`],
/// so a create that already reached the vault can still answer.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(20);
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MB
pub const VAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(5);
pub const SESSION_REFRESH_BUFFER: Duration = Duration::from_secs(60); // refresh 60s before expiry

pub const PAM_API_PATH: &str = "PasswordVault/API";
pub const PLATFORM_TOKEN_PATH: &str = "oauth2/platformtoken";
