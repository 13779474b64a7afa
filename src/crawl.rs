use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::config::ProviderConfig;
use crate::fetch::{RetryPolicy, fetch_with_retry};
use crate::formats::{CrdData, LessonMeta, LessonsPage};

const SCRAPER_USER_AGENT: &str = "hanzi-reader/0.1";

/// Client for the provider's lesson index and CRD endpoints.
#[derive(Debug, Clone)]
pub struct LessonApi {
    client: reqwest::Client,
    provider: ProviderConfig,
    retry: RetryPolicy,
    page_delay: Duration,
}

impl LessonApi {
    pub fn new(
        provider: ProviderConfig,
        retry: RetryPolicy,
        page_delay: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("build lesson api http client")?;
        Ok(Self {
            client,
            provider,
            retry,
            page_delay,
        })
    }

    /// Walks the paginated index from the first page until no next page is
    /// advertised. Pages are fetched strictly one after another.
    pub async fn fetch_all_lessons(&self, session_cookie: &str) -> anyhow::Result<Vec<LessonMeta>> {
        let mut headers = json_headers();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(session_cookie).context("session cookie is not a valid header")?,
        );

        let mut lessons = Vec::new();
        let mut next = Some(self.provider.lessons_url()?);
        let mut page = 1_usize;

        while let Some(url) = next {
            tracing::info!(page, %url, "fetching lessons page");
            let response = fetch_with_retry(&self.client, &url, &headers, self.retry)
                .await
                .with_context(|| format!("fetch lessons page {page}"))?;
            let body: serde_json::Value = response
                .json()
                .await
                .with_context(|| format!("decode lessons page {page}"))?;
            let parsed = parse_lessons_page(body).with_context(|| format!("lessons page {page}"))?;

            let fetched = parsed.lessons.len();
            lessons.extend(parsed.lessons);
            tracing::info!(page, fetched, total = lessons.len(), "fetched lessons page");

            next = match parsed.next_page_url.as_deref().filter(|u| !u.is_empty()) {
                Some(raw) => Some(
                    self.provider
                        .resolve(raw)
                        .with_context(|| format!("resolve next page url: {raw}"))?,
                ),
                None => None,
            };
            page += 1;

            if next.is_some() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        tracing::info!(total = lessons.len(), pages = page - 1, "lesson index complete");
        Ok(lessons)
    }

    /// Fetches a lesson's CRD payload. The CDN is public, so no cookie is sent.
    pub async fn fetch_crd(&self, crd_url: &str) -> anyhow::Result<CrdData> {
        let url = self
            .provider
            .resolve(crd_url)
            .with_context(|| format!("resolve crd url: {crd_url}"))?;
        let response = fetch_with_retry(&self.client, &url, &json_headers(), self.retry).await?;
        let body: serde_json::Value = response.json().await.context("decode crd json")?;
        CrdData::from_value(body)
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(SCRAPER_USER_AGENT));
    headers
}

fn parse_lessons_page(body: serde_json::Value) -> anyhow::Result<LessonsPage> {
    if !body.get("lessons").is_some_and(serde_json::Value::is_array) {
        anyhow::bail!("invalid response format: expected 'lessons' array");
    }
    serde_json::from_value(body).context("deserialize lessons page")
}

/// Resolves a possibly relative provider URL; absolute URLs pass through.
pub fn resolve_against(origin: &Url, raw: &str) -> anyhow::Result<Url> {
    origin
        .join(raw)
        .with_context(|| format!("resolve {raw:?} against {origin}"))
}
