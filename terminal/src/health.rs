//! Health endpoint polling

use anyhow::{Context, Result};
use reqwest::header::CACHE_CONTROL;
use shared::HealthResponse;

/// Fetch `/health` without letting any cache answer for the server.
pub async fn fetch_health(client: &reqwest::Client, url: &str) -> Result<HealthResponse> {
    let response = client
        .get(url)
        .header(CACHE_CONTROL, "no-store")
        .send()
        .await
        .context("Health request failed")?
        .error_for_status()
        .context("Health endpoint returned an error status")?;

    response
        .json::<HealthResponse>()
        .await
        .context("Failed to parse health response")
}
