//! Cadence: the closed set of polling intervals.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How often the scheduler runs a poll cycle.
///
/// `Disabled` maps to no interval at all: the scheduler stays inert rather
/// than polling at some very long period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Disabled,
}

impl Cadence {
    /// Interval between cycles, or None for `Disabled`.
    pub fn interval(self) -> Option<Duration> {
        match self {
            Cadence::Hourly => Some(Duration::from_secs(3_600)),
            Cadence::Daily => Some(Duration::from_secs(86_400)),
            Cadence::Weekly => Some(Duration::from_secs(604_800)),
            // 30 days.
            Cadence::Monthly => Some(Duration::from_secs(2_592_000)),
            Cadence::Disabled => None,
        }
    }

    pub fn is_disabled(self) -> bool {
        matches!(self, Cadence::Disabled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Hourly => "hourly",
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
            Cadence::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown cadence {0:?} (expected hourly, daily, weekly, monthly, or disabled)")]
pub struct ParseCadenceError(String);

impl FromStr for Cadence {
    type Err = ParseCadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Cadence::Hourly),
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            "monthly" => Ok(Cadence::Monthly),
            "disabled" => Ok(Cadence::Disabled),
            other => Err(ParseCadenceError(other.to_string())),
        }
    }
}
