use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::HeaderMap;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first; `retries + 1` requests at most.
    pub retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sleep after failed attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// GET `url`, retrying network errors and every non-2xx status with
/// exponential backoff.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &Url,
    headers: &HeaderMap,
    policy: RetryPolicy,
) -> anyhow::Result<reqwest::Response> {
    let max_attempts = policy.retries + 1;
    let mut last_error = String::new();

    for attempt in 0..max_attempts {
        match try_fetch(client, url, headers).await {
            Ok(response) => return Ok(response),
            Err(err) => last_error = format!("{err:#}"),
        }

        if attempt + 1 < max_attempts {
            let delay = policy.delay_for(attempt);
            tracing::warn!(
                %url,
                attempt = attempt + 1,
                max_attempts,
                error = %last_error,
                delay_ms = delay.as_millis() as u64,
                "fetch failed; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    anyhow::bail!("fetch failed after {max_attempts} attempts: {last_error}")
}

async fn try_fetch(
    client: &reqwest::Client,
    url: &Url,
    headers: &HeaderMap,
) -> anyhow::Result<reqwest::Response> {
    let response = client
        .get(url.clone())
        .headers(headers.clone())
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        );
    }
    Ok(response)
}
