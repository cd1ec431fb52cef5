//! `devhub-provision` -- provision one workspace from a request file.
//!
//! Reads a JSON [`ProvisioningRequest`] from the path given as the only
//! argument, runs it against Azure DevOps, and prints the result as JSON.
//! Exits non-zero when the request is invalid or the project cannot be
//! resolved.
//!
//! # Environment variables
//!
//! | Variable                    | Required | Default                       |
//! |-----------------------------|----------|-------------------------------|
//! | `AZDO_ORGANIZATION`         | yes      | --                            |
//! | `AZDO_PAT`                  | yes      | --                            |
//! | `AZDO_BASE_URL`             | no       | `https://dev.azure.com/{org}` |
//! | `AZDO_API_VERSION`          | no       | `7.1`                         |
//! | `AZDO_REQUEST_TIMEOUT_SECS` | no       | `30`                          |
//!
//! Polling and delay overrides are listed on
//! [`ProvisioningConfig::from_env`].

use std::sync::Arc;

use anyhow::Context;
use devhub_azdo::api::AzureDevOpsApi;
use devhub_azdo::config::AzdoConfig;
use devhub_azdo::poller::TokioSleeper;
use devhub_core::types::ProvisioningRequest;
use devhub_provisioning::config::ProvisioningConfig;
use devhub_provisioning::Orchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devhub_provisioning=info,devhub_azdo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: devhub-provision <request.json>")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let request: ProvisioningRequest =
        serde_json::from_str(&raw).with_context(|| format!("parsing request {path}"))?;

    let azdo = AzdoConfig::from_env()?;
    let config = ProvisioningConfig::from_env()?;
    tracing::info!(organization = %azdo.organization, base_url = %azdo.base_url, "Starting devhub-provision");

    let client = Arc::new(AzureDevOpsApi::new(&azdo)?);
    let orchestrator = Orchestrator::new(client, Arc::new(TokioSleeper), config);

    let result = orchestrator.run(&request).await?;
    if result.is_degraded() {
        tracing::warn!(errors = result.errors.len(), "Workspace provisioned with errors");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
