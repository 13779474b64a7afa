use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download every lesson and write normalized JSON and text artifacts.
    Scrape(ScrapeArgs),
    /// Print the text rendering of a previously scraped lesson.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Only process lessons at this level (e.g. newbie, upper-intermediate).
    #[arg(long)]
    pub level: Option<String>,

    /// Maximum number of lessons to process.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output directory.
    #[arg(long, default_value = "output")]
    pub output_dir: String,

    /// Concurrent CRD downloads.
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Skip lessons that already have JSON output.
    #[arg(long)]
    pub skip_existing: bool,

    /// Skip text outputs (by-level, by-series, series info).
    #[arg(long)]
    pub no_text: bool,

    /// Account email used to sign in.
    #[arg(long, env = "DUCHINESE_EMAIL")]
    pub email: Option<String>,

    /// Account password used to sign in.
    #[arg(long, env = "DUCHINESE_PASSWORD", hide_env_values = true)]
    pub password: Option<Secret>,

    /// Use an existing session cookie instead of signing in.
    #[arg(long, env = "DUCHINESE_SESSION_COOKIE", hide_env_values = true)]
    pub session_cookie: Option<Secret>,

    /// Provider origin; lesson index and sign-in paths are resolved against it.
    #[arg(long, default_value = "https://duchinese.net")]
    pub origin: String,

    /// Retries per HTTP request after the first attempt.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Backoff before the first retry; doubles on each further retry.
    #[arg(long, default_value_t = 1000)]
    pub retry_base_ms: u64,

    /// Delay between lesson index pages (politeness).
    #[arg(long, default_value_t = 100)]
    pub page_delay_ms: u64,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Output directory written by `scrape`.
    #[arg(long, default_value = "output")]
    pub output_dir: String,

    /// Lesson id.
    #[arg(long)]
    pub id: u64,
}

/// Credential value, redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for Secret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}
