// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Codec for the Azure custom-provider routing header.
//!
//! ARM forwards every resource request to the provider endpoint at `/` and
//! carries the logical resource path in the `X-Ms-Customproviders-Requestpath`
//! header:
//!
//! ```text
//! segments[0,1] /subscriptions/{subscriptionId}
//! segments[2,3] /resourceGroups/{resourceGroupName}
//! segments[4,5] /providers/{providerNamespace}
//! segments[6,7] /resourceProviders/{customProviderInstanceName}
//! segments[8]   /{resourceTypeName}
//! segments[9]   /{resourceInstanceName}          (absent on type-level requests)
//! ```
//!
//! Segment positions are fixed. The literal labels at even positions are not
//! checked; anything past index 9 is ignored.

use std::fmt;
use std::str::FromStr;

use crate::constants::{CUSTOM_PROVIDER_TYPE_PREFIX, MIN_PATH_SEGMENTS};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty request path")]
    EmptyPath,
    #[error("invalid request path, expecting 9 or 10 segments, got {count}: {path}")]
    MalformedPath { count: usize, path: String },
}

impl PathError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPath => "EmptyPath",
            Self::MalformedPath { .. } => "MalformedPath",
        }
    }
}

/// Structured form of the routing header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider_namespace: String,
    pub custom_provider: String,
    pub resource_type: String,
    pub resource_name: Option<String>,
}

impl ResourceAddress {
    /// Parses a raw header value.
    ///
    /// # Errors
    ///
    /// - [`PathError::EmptyPath`] if nothing remains after trimming slashes
    /// - [`PathError::MalformedPath`] if fewer than 9 segments are present
    pub fn decode(header: &str) -> Result<Self, PathError> {
        let trimmed = header.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(PathError::EmptyPath);
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() < MIN_PATH_SEGMENTS {
            return Err(PathError::MalformedPath {
                count: segments.len(),
                path: header.to_string(),
            });
        }
        if segments.len() > MIN_PATH_SEGMENTS + 1 {
            tracing::debug!(
                "[provider] ignoring {} trailing segments in request path {}",
                segments.len() - MIN_PATH_SEGMENTS - 1,
                header
            );
        }

        Ok(Self {
            subscription_id: segments[1].to_string(),
            resource_group: segments[3].to_string(),
            provider_namespace: segments[5].to_string(),
            custom_provider: segments[7].to_string(),
            resource_type: segments[8].to_string(),
            resource_name: segments
                .get(9)
                .filter(|name| !name.is_empty())
                .map(|name| name.to_string()),
        })
    }

    /// Canonical ARM resource ID for this address.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// ARM `type` for responses, e.g. `Microsoft.CustomProviders/resourceProviders/safes`.
    pub fn arm_type(&self) -> String {
        format!("{}/{}", CUSTOM_PROVIDER_TYPE_PREFIX, self.resource_type)
    }

    pub fn name(&self) -> &str {
        self.resource_name.as_deref().unwrap_or_default()
    }

    pub fn is_resource_type(&self, resource_type: &str) -> bool {
        self.resource_type.eq_ignore_ascii_case(resource_type)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/resourceProviders/{}/{}",
            self.subscription_id,
            self.resource_group,
            self.provider_namespace,
            self.custom_provider,
            self.resource_type
        )?;
        if let Some(name) = &self.resource_name {
            write!(f, "/{}", name)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceAddress {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
