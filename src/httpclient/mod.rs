use std::time::Duration;

use anyhow::Context;

pub mod fetch;

/// Builds the reqwest client shared by metadata fetches and image probes.
/// No timeout is applied unless one is configured.
pub fn build_client(timeout: Option<Duration>) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(crate::USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}
