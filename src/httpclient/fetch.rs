use tracing::{info, warn};

pub(crate) fn create_http_error(status: reqwest::StatusCode, url: &str) -> anyhow::Error {
    anyhow::anyhow!("HTTP error: status {status} from {url}")
}

/// GET `url`, treating any non-2xx status as an error.
pub(crate) async fn fetch_ok(client: &reqwest::Client, url: &str) -> anyhow::Result<reqwest::Response> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(create_http_error(status, url));
    }
    Ok(response)
}

/// HEAD `url` and report whether it answered with a 2xx status.
pub(crate) async fn head_ok(client: &reqwest::Client, url: &str) -> anyhow::Result<()> {
    let response = client.head(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(create_http_error(status, url));
    }
    Ok(())
}

/// Logs whether an image URL is reachable. Never fails.
pub(crate) async fn probe_reachability(client: reqwest::Client, url: String) -> bool {
    match head_ok(&client, &url).await {
        Ok(()) => {
            info!("Image is accessible: {}", url);
            true
        }
        Err(e) => {
            warn!("Image not accessible: {} ({})", url, e);
            false
        }
    }
}
