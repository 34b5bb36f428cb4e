//! Health endpoint polling

use gloo_net::http::Request;
use shared::HealthResponse;
use web_sys::RequestCache;

/// Fetch `/health`, bypassing the HTTP cache. Non-2xx responses count as
/// failures.
pub async fn fetch_health(url: &str) -> Result<HealthResponse, gloo_net::Error> {
    let response = Request::get(url)
        .cache(RequestCache::NoStore)
        .send()
        .await?;

    if !response.ok() {
        return Err(gloo_net::Error::GlooError(format!(
            "health check returned {}",
            response.status()
        )));
    }

    response.json::<HealthResponse>().await
}
