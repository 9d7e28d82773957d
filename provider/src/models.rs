// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! ARM custom-provider request and response shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::request_path::ResourceAddress;
use crate::vault::models::{AddAccountRequest, AddSafeRequest, Safe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Succeeded,
}

/// Resource properties with ARM's `provisioningState` alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioned<P> {
    #[serde(flatten)]
    pub resource: P,
    pub provisioning_state: ProvisioningState,
}

/// Success body for every resource operation.
///
/// ```json
/// {
///   "id": "/subscriptions/.../resourceProviders/cp/safes/safe1",
///   "name": "safe1",
///   "type": "Microsoft.CustomProviders/resourceProviders/safes",
///   "properties": {"safeName": "safe1", "provisioningState": "Succeeded"}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningResponse<P> {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub properties: Provisioned<P>,
}

impl<P> ProvisioningResponse<P> {
    pub fn succeeded(address: &ResourceAddress, resource: P) -> Self {
        Self {
            id: address.encode(),
            name: address.name().to_string(),
            resource_type: address.arm_type(),
            properties: Provisioned {
                resource,
                provisioning_state: ProvisioningState::Succeeded,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SafeRequest {
    #[validate(nested)]
    pub properties: SafeRequestProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SafeRequestProperties {
    #[validate(length(min = 1, message = "safeName is not set"))]
    pub safe_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<SafeRequestProperties> for AddSafeRequest {
    fn from(properties: SafeRequestProperties) -> Self {
        AddSafeRequest {
            safe_name: properties.safe_name,
            description: properties.description,
            location: properties.location,
            extra: properties.extra,
        }
    }
}

/// Safe properties reported back to ARM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeProperties {
    pub safe_name: String,
    #[serde(rename = "safeID")]
    pub safe_id: String,
    pub description: String,
}

impl From<Safe> for SafeProperties {
    fn from(safe: Safe) -> Self {
        SafeProperties {
            safe_name: safe.safe_name,
            safe_id: safe.safe_url_id,
            description: safe.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AccountRequest {
    #[validate(nested)]
    pub properties: AddAccountRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error body, `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Version information fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub build_date: String,
}

impl BuildInfo {
    pub fn new(version: impl Into<String>, build_date: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build_date: build_date.into(),
        }
    }

    /// Crate version plus the `BUILD_DATE` set when compiling (`dev` if unset).
    pub fn from_build_env() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"), option_env!("BUILD_DATE").unwrap_or("dev"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,
    pub build_date: String,
    pub status: String,
    pub service: String,
    pub env_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_error: Option<String>,
    #[serde(rename = "publicIP", skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(rename = "pamclientcheck", skip_serializing_if = "Option::is_none")]
    pub pam_client_check: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vault::models::Account;
    use serde_json::json;

    fn address(name: &str) -> ResourceAddress {
        ResourceAddress::decode(&format!(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CustomProviders/resourceProviders/cp/accounts/{}",
            name
        ))
        .unwrap()
    }

    #[test]
    fn test_provisioning_response_injects_state() {
        let account = Account {
            id: "12_3".to_string(),
            name: "acct1".to_string(),
            safe_name: Some("safe1".to_string()),
            extra: BTreeMap::from([("categoryModificationTime".to_string(), json!(1758822458))]),
            ..Default::default()
        };

        let response = ProvisioningResponse::succeeded(&address("safe1.acct1"), account);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(
            value["id"],
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CustomProviders/resourceProviders/cp/accounts/safe1.acct1"
        );
        assert_eq!(value["name"], "safe1.acct1");
        assert_eq!(value["type"], "Microsoft.CustomProviders/resourceProviders/accounts");
        assert_eq!(value["properties"]["id"], "12_3");
        assert_eq!(value["properties"]["safeName"], "safe1");
        assert_eq!(value["properties"]["categoryModificationTime"], 1758822458);
        assert_eq!(value["properties"]["provisioningState"], "Succeeded");
    }

    #[test]
    fn test_safe_request_requires_safe_name() {
        let request: SafeRequest =
            serde_json::from_value(json!({"properties": {"safeName": "", "description": "d"}})).unwrap();
        assert!(request.validate().is_err());

        let missing = serde_json::from_value::<SafeRequest>(json!({"properties": {"description": "d"}}));
        assert!(missing.is_err());
    }

    #[test]
    fn test_safe_properties_from_vault_safe() {
        let safe = Safe {
            safe_url_id: "s1".to_string(),
            safe_name: "s1".to_string(),
            description: None,
            ..Default::default()
        };
        let value = serde_json::to_value(SafeProperties::from(safe)).unwrap();
        assert_eq!(value, json!({"safeName": "s1", "safeID": "s1", "description": ""}));
    }
}
