use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::cli::{ScrapeArgs, Secret};
use crate::fetch::RetryPolicy;
use crate::level::Level;

const LESSONS_PATH: &str = "/lessons.json";
const SIGN_IN_PATH: &str = "/accounts/sign_in";

/// Everything a scrape run needs, validated once at startup.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub credentials: Credentials,
    pub provider: ProviderConfig,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub level: Option<Level>,
    pub limit: Option<usize>,
    pub skip_existing: bool,
    pub write_text: bool,
    pub retry: RetryPolicy,
    pub page_delay: Duration,
}

#[derive(Clone)]
pub enum Credentials {
    Password { email: String, password: String },
    SessionCookie(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            Self::SessionCookie(_) => f.write_str("SessionCookie(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub origin: Url,
}

impl ProviderConfig {
    pub fn new(origin: &str) -> anyhow::Result<Self> {
        let origin = Url::parse(origin).with_context(|| format!("parse origin: {origin}"))?;
        if origin.scheme() != "http" && origin.scheme() != "https" {
            anyhow::bail!("origin must be http/https: {origin}");
        }
        Ok(Self { origin })
    }

    pub fn lessons_url(&self) -> anyhow::Result<Url> {
        self.resolve(LESSONS_PATH)
    }

    pub fn sign_in_url(&self) -> anyhow::Result<Url> {
        self.resolve(SIGN_IN_PATH)
    }

    pub fn resolve(&self, raw: &str) -> anyhow::Result<Url> {
        crate::crawl::resolve_against(&self.origin, raw)
    }
}

impl ScrapeConfig {
    pub fn from_args(args: &ScrapeArgs) -> anyhow::Result<Self> {
        let credentials = credentials(args)?;
        let provider = ProviderConfig::new(&args.origin).context("--origin")?;

        if args.concurrency == 0 {
            anyhow::bail!("--concurrency must be >= 1");
        }
        if args.limit == Some(0) {
            anyhow::bail!("--limit must be >= 1");
        }
        let level = args
            .level
            .as_deref()
            .map(Level::parse)
            .transpose()
            .context("--level")?;

        Ok(Self {
            credentials,
            provider,
            output_dir: PathBuf::from(&args.output_dir),
            concurrency: args.concurrency,
            level,
            limit: args.limit,
            skip_existing: args.skip_existing,
            write_text: !args.no_text,
            retry: RetryPolicy {
                retries: args.retries,
                base_delay: Duration::from_millis(args.retry_base_ms),
            },
            page_delay: Duration::from_millis(args.page_delay_ms),
        })
    }
}

fn credentials(args: &ScrapeArgs) -> anyhow::Result<Credentials> {
    if let Some(cookie) = trimmed(args.session_cookie.as_ref().map(Secret::expose)) {
        return Ok(Credentials::SessionCookie(cookie));
    }
    let password = args
        .password
        .as_ref()
        .map(Secret::expose)
        .filter(|p| !p.is_empty())
        .map(str::to_owned);
    match (trimmed(args.email.as_deref()), password) {
        (Some(email), Some(password)) => Ok(Credentials::Password { email, password }),
        _ => anyhow::bail!(
            "missing credentials: set DUCHINESE_EMAIL and DUCHINESE_PASSWORD (or DUCHINESE_SESSION_COOKIE)"
        ),
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;
    use crate::cli::{Cli, Command};

    fn scrape_args(extra: &[&str]) -> ScrapeArgs {
        let mut argv = vec!["hanzi-reader", "scrape"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Scrape(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn defaults_match_cli_contract() {
        let config =
            ScrapeConfig::from_args(&scrape_args(&["--session-cookie", "s=1"])).unwrap();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert!(config.write_text);
        assert!(!config.skip_existing);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.page_delay, Duration::from_millis(100));
        assert_eq!(
            config.provider.lessons_url().unwrap().as_str(),
            "https://duchinese.net/lessons.json"
        );
    }

    #[test]
    fn password_pair_is_accepted() {
        let config = ScrapeConfig::from_args(&scrape_args(&[
            "--email",
            "me@example.test",
            "--password",
            "pw",
            "--level",
            "upper-intermediate",
            "--no-text",
        ]))
        .unwrap();
        assert!(matches!(config.credentials, Credentials::Password { .. }));
        assert_eq!(config.level, Some(Level::UpperIntermediate));
        assert!(!config.write_text);
        assert!(!format!("{:?}", config.credentials).contains("pw"));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut args = scrape_args(&["--session-cookie", "s=1", "--concurrency", "0"]);
        assert!(ScrapeConfig::from_args(&args).is_err());

        args.concurrency = 2;
        args.level = Some("expert".to_owned());
        let err = format!("{:#}", ScrapeConfig::from_args(&args).unwrap_err());
        assert!(err.contains("unknown level"), "{err}");

        args.level = None;
        args.origin = "ftp://example.test".to_owned();
        assert!(ScrapeConfig::from_args(&args).is_err());
    }

    #[test]
    fn missing_credentials_are_fatal() {
        let mut args = scrape_args(&[]);
        args.email = Some("me@example.test".to_owned());
        args.password = None;
        args.session_cookie = None;
        let err = ScrapeConfig::from_args(&args).unwrap_err().to_string();
        assert!(err.contains("missing credentials"));
    }
}
