//! Session login against the provider's Rails/Devise sign-in form.

use anyhow::Context as _;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, SET_COOKIE, USER_AGENT};
use url::Url;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// Signs in and returns a `Cookie` header value for the authenticated session.
pub async fn authenticate(sign_in_url: &Url, email: &str, password: &str) -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("build sign-in http client")?;

    let page = client
        .get(sign_in_url.clone())
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(ACCEPT, "text/html")
        .send()
        .await
        .with_context(|| format!("GET {sign_in_url}"))?;
    let mut jar = CookieJar::default();
    jar.absorb(page.headers());
    let html = page.text().await.context("read sign-in page")?;

    let token = csrf_token(&html)
        .ok_or_else(|| anyhow::anyhow!("authentication failed: could not find CSRF token"))?;

    let form = [
        ("authenticity_token", token.as_str()),
        ("account[email]", email),
        ("account[password]", password),
    ];
    let response = client
        .post(sign_in_url.clone())
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(COOKIE, jar.header_value())
        .form(&form)
        .send()
        .await
        .with_context(|| format!("POST {sign_in_url}"))?;
    jar.absorb(response.headers());

    let status = response.status();
    if status != StatusCode::FOUND && status != StatusCode::SEE_OTHER {
        let body = response.text().await.unwrap_or_default();
        let message = alert_message(&body).unwrap_or_else(|| format!("status {}", status.as_u16()));
        anyhow::bail!("authentication failed: {message}");
    }

    tracing::info!(cookies = jar.len(), "authenticated");
    Ok(jar.header_value())
}

/// Cookies by name; a later value replaces an earlier one in place.
#[derive(Debug, Default)]
struct CookieJar {
    pairs: Vec<(String, String)>,
}

impl CookieJar {
    fn absorb(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            self.set_from_header(raw);
        }
    }

    fn set_from_header(&mut self, raw: &str) {
        let pair = raw.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        match self.pairs.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value.to_owned(),
            None => self.pairs.push((name.to_owned(), value.to_owned())),
        }
    }

    fn header_value(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Hidden form input first, then the `csrf-token` meta tag.
fn csrf_token(html: &str) -> Option<String> {
    attribute_after(html, r#"name="authenticity_token" value=""#)
        .or_else(|| attribute_after(html, r#"name="csrf-token" content=""#))
}

fn attribute_after(html: &str, marker: &str) -> Option<String> {
    let start = html.find(marker)? + marker.len();
    let rest = &html[start..];
    let end = rest.find('"')?;
    let value = &rest[..end];
    (!value.is_empty()).then(|| value.to_owned())
}

/// Text of the first element whose opening tag mentions `alert`.
fn alert_message(html: &str) -> Option<String> {
    let mut rest = html;
    while let Some(pos) = rest.find("alert") {
        rest = &rest[pos + "alert".len()..];
        let close = rest.find(['>', '<'])?;
        if rest[close..].starts_with('<') {
            continue;
        }
        let text = &rest[close + 1..];
        let end = text.find('<')?;
        let message = text[..end].trim();
        if !message.is_empty() {
            return Some(message.to_owned());
        }
    }
    None
}
