// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::{ErrorDetails, ErrorResponse};
use crate::request_path::PathError;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error("{0}")]
    BadRequestPath(#[from] PathError),
    #[error("resource name must be in format: {{safename}}.{{accountname}}, got '{0}'")]
    ResourceNameMalformed(String),
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),
    #[error("Failed to create PAM client: {0}")]
    PamClient(String),
    #[error("Failed to create safe: {0}")]
    SafeCreation(String),
    #[error("delete safe functionality is not implemented by the vault integration")]
    SafeDeletion,
    #[error("Safe not found: {name}")]
    SafeNotFound { status: u16, name: String },
    #[error("Failed to get safe: {message}")]
    GetSafeDetails { status: u16, message: String },
    #[error("failed to add account: {0}")]
    AddAccount(String),
    #[error("could not get accounts: {0}")]
    GetAccounts(String),
    #[error("delete account functionality is not implemented by the vault integration")]
    AccountDeletion,
    #[error("{0} not found")]
    ResourceNotFound(String),
    #[error("Endpoint {0} not found")]
    EndpointNotFound(String),
    #[error("resource type '{0}' is not supported")]
    MethodNotAllowed(String),
    #[error("request did not complete within {0:?}")]
    RequestTimeout(Duration),
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
}

impl AppError {
    /// Error code reported in the ARM error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequestPath(_) => "BadRequestPath",
            Self::ResourceNameMalformed(_) => "ResourceNameMalformed",
            Self::InvalidRequestBody(_) => "InvalidRequestBody",
            Self::PamClient(_) => "PAMClientError",
            Self::SafeCreation(_) => "SafeCreationError",
            Self::SafeDeletion => "SafeDeletionError",
            Self::SafeNotFound { .. } => "SafeNotFound",
            Self::GetSafeDetails { .. } => "GetSafeDetailsError",
            Self::AddAccount(_) => "AddAccountError",
            Self::GetAccounts(_) => "GetAccountsError",
            Self::AccountDeletion => "AccountDeletionError",
            Self::ResourceNotFound(_) => "ResourceNotFound",
            Self::EndpointNotFound(_) => "EndpointNotFound",
            Self::MethodNotAllowed(_) => "MethodNotAllowed",
            Self::RequestTimeout(_) => "RequestTimeout",
            Self::PayloadTooLarge(_) => "PayloadTooLarge",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequestPath(_) | Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ResourceNameMalformed(_) | Self::AddAccount(_) | Self::GetAccounts(_) => {
                StatusCode::CONFLICT
            }
            Self::PamClient(_) | Self::SafeCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SafeDeletion | Self::AccountDeletion => StatusCode::NOT_IMPLEMENTED,
            Self::SafeNotFound { status, .. } | Self::GetSafeDetails { status, .. } => {
                vault_status(*status)
            }
            Self::ResourceNotFound(_) | Self::EndpointNotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Passes the vault's error status through; anything that is not an error
/// status becomes a 500.
fn vault_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        tracing::debug!("[provider] responding {} {}: {}", status.as_u16(), body.error.code, body.error.message);

        (status, Json(body)).into_response()
    }
}
