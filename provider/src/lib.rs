// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # PAM Custom Provider
//!
//! An Azure Resource Manager custom resource provider that exposes PAM vault
//! safes and accounts as ARM resources.
//!
//! ## Architecture
//!
//! ```text
//! ARM -> HTTP API (this crate) -> Privilege Cloud REST API
//!              |
//!              +-> identity tenant (platform token)
//! ```
//!
//! ARM forwards every resource request to `/` and names the target resource
//! in the `X-Ms-Customproviders-Requestpath` header. The provider decodes
//! that path, dispatches on the resource type, and answers in ARM's
//! provisioning envelope.
//!
//! ## Modules
//!
//! - [`accounts`]: account handlers and `{safe}.{account}` name parsing
//! - [`application`]: HTTP server setup with Axum, body limits, and timeouts
//! - [`configuration`]: CLI/environment options with clap
//! - [`constants`]: Configuration constants for the application
//! - [`errors`]: Application error types with HTTP response mapping
//! - [`models`]: ARM request/response types with validation
//! - [`reconcile`]: bounded, cancellable polling after account creation
//! - [`request_path`]: routing header codec
//! - [`routes`]: request dispatch plus discovery and health handlers
//! - [`safes`]: safe handlers
//! - [`vault`]: vault client traits, the Privilege Cloud client, and a mock
//!
//! ## Usage
//!
//! ```bash
//! IDTENANTURL=https://abc1234.id.cyberark.cloud \
//! PCLOUDURL=https://tenant.privilegecloud.cyberark.cloud \
//! PAMUSER=svc-provider@tenant PAMPASS=... \
//! pam-custom-provider --port 8080
//! ```
//!
//! ## Security Considerations
//!
//! - Platform tokens are cached and refreshed 60 seconds before expiry
//! - Passwords and tokens are zeroized on drop and redacted from `Debug`
//! - Request bodies are limited to 1 MiB
//! - 30-second request timeout, which also stops post-create polling

pub mod accounts;
pub mod application;
pub mod configuration;
pub mod constants;
pub mod errors;
pub mod models;
pub mod reconcile;
pub mod request_path;
pub mod routes;
pub mod safes;
pub mod vault;
