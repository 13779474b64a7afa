use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "newbie")]
    Newbie,
    #[serde(rename = "elementary")]
    Elementary,
    #[serde(rename = "intermediate")]
    Intermediate,
    #[serde(rename = "upper intermediate")]
    UpperIntermediate,
    #[serde(rename = "advanced")]
    Advanced,
    #[serde(rename = "master")]
    Master,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Newbie,
        Level::Elementary,
        Level::Intermediate,
        Level::UpperIntermediate,
        Level::Advanced,
        Level::Master,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Newbie => "newbie",
            Level::Elementary => "elementary",
            Level::Intermediate => "intermediate",
            Level::UpperIntermediate => "upper intermediate",
            Level::Advanced => "advanced",
            Level::Master => "master",
        }
    }

    /// Accepts any casing and either `-` or spaces between words.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let key = raw
            .trim()
            .to_lowercase()
            .split(|c: char| c == '-' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == key)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown level: {raw:?}. expected one of: newbie, elementary, intermediate, upper-intermediate, advanced, master"
                )
            })
    }

    /// Unknown provider levels are shown as intermediate.
    pub fn normalize(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == raw.trim().to_lowercase())
            .unwrap_or(Level::Intermediate)
    }

    /// Whether a raw provider level string names this level.
    pub fn matches(self, raw: &str) -> bool {
        raw.trim().to_lowercase() == self.as_str()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory name for a raw level string: lowercase, whitespace runs become `-`.
pub fn level_dir_name(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
