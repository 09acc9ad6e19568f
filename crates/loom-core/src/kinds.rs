use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a type producer participates in a type's existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContributorKind {
    /// Claims the type exists; at most one primary producer may claim a name.
    Primary,
    /// Only augments a type that already exists.
    Supplemental,
}

/// The kind of change carried by a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshKind {
    Creation,
    Modification,
    Deletion,
}

/// Directory listing cache policy of the virtual file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachingMode {
    /// Re-list the physical directory on every call.
    NoCaching,
    /// Re-list when the directory modification timestamp changes.
    #[default]
    CheckTimestamps,
    /// Like `CheckTimestamps`, but also re-list when the last refresh is too close to the
    /// directory timestamp to trust coarse filesystem clocks.
    FuzzyTimestamps,
    /// List once; only `clear_caches` invalidates.
    FullCaching,
}

impl CachingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CachingMode::NoCaching => "no-caching",
            CachingMode::CheckTimestamps => "check-timestamps",
            CachingMode::FuzzyTimestamps => "fuzzy-timestamps",
            CachingMode::FullCaching => "full-caching",
        }
    }
}

impl fmt::Display for CachingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCachingModeError(String);

impl fmt::Display for ParseCachingModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown caching mode: {}", self.0)
    }
}

impl std::error::Error for ParseCachingModeError {}

impl FromStr for CachingMode {
    type Err = ParseCachingModeError;

    /// Accepts kebab-case, snake_case and SCREAMING_SNAKE_CASE spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "no-caching" => Ok(CachingMode::NoCaching),
            "check-timestamps" => Ok(CachingMode::CheckTimestamps),
            "fuzzy-timestamps" => Ok(CachingMode::FuzzyTimestamps),
            "full-caching" => Ok(CachingMode::FullCaching),
            _ => Err(ParseCachingModeError(s.to_string())),
        }
    }
}
