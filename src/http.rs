use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::debug;

use crate::config::Settings;
use crate::error::{CrawlError, Result};

/// Shared client: browser-like headers, per-request timeout from settings.
pub fn build_client(settings: &Settings) -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("DNT", HeaderValue::from_static("1"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

    let mut builder = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(headers)
        .timeout(settings.request_timeout())
        .connect_timeout(Duration::from_secs(10));
    // Tests talk to localhost fixtures; keep them off any ambient proxy.
    if cfg!(test) {
        builder = builder.no_proxy();
    }
    Ok(builder.build()?)
}

/// GET `url` and return the body. Non-success statuses are fetch errors.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| CrawlError::fetch(url, e))?;
    response.text().await.map_err(|e| CrawlError::fetch(url, e))
}

pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| CrawlError::fetch(url, e))?;
    let bytes = response.bytes().await.map_err(|e| CrawlError::fetch(url, e))?;
    Ok(bytes.to_vec())
}

/// Sleep a random number of milliseconds from `range_ms`.
pub async fn polite_pause(range_ms: &RangeInclusive<u64>) {
    let delay = jitter(range_ms);
    if !delay.is_zero() {
        debug!(ms = delay.as_millis() as u64, "Politeness delay");
        tokio::time::sleep(delay).await;
    }
}

fn jitter(range_ms: &RangeInclusive<u64>) -> Duration {
    if range_ms.start() >= range_ms.end() {
        return Duration::from_millis(*range_ms.start());
    }
    Duration::from_millis(rand::thread_rng().gen_range(range_ms.clone()))
}
