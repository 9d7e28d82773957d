// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use anyhow::Context;
use clap::Parser;
use pam_custom_provider::application::Application;
use pam_custom_provider::configuration::ProviderOptions;
use pam_custom_provider::models::BuildInfo;
use pam_custom_provider::vault::pam::PamConnector;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("[provider] init");

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        // this needs to be set to remove duplicated information in the log.
        .with_current_span(false)
        // ANSI color codes are unreadable in the container log stream.
        .with_ansi(false)
        // the log collector adds the ingestion time.
        .without_time()
        // remove the name of the function from every log entry
        .with_target(false)
        .init();

    // get configuration options from arguments and environment variables
    let options = ProviderOptions::parse();

    tracing::info!("[provider] {:?}", &options);

    options
        .validate()
        .context("refusing to start without vault configuration")?;
    options
        .check_timing()
        .context("refusing to start with timing settings that overrun the request deadline")?;

    let build_info = BuildInfo::from_build_env();
    tracing::info!(
        "[provider] version {} built {}",
        build_info.version,
        build_info.build_date
    );

    let connector = PamConnector::new(options.clone()).context("failed to build vault client")?;

    let application = Application::build(options, build_info, Arc::new(connector))
        .await
        .context("failed to bind listener")?;

    tracing::info!("[provider] serving on port {}", application.port());

    application
        .run_until_stopped()
        .await
        .context("server stopped unexpectedly")
}
