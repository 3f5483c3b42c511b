//! Check status severity and tallies
//!
//! `CheckStatus` is totally ordered `PASS < INFO < SKIP < WARN < FAIL`. The
//! order drives display sorting (worst first) and escalation when field
//! statuses are folded into an overall result status.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass = 0,
    Info = 1,
    Skip = 2,
    Warn = 3,
    Fail = 4,
}

impl CheckStatus {
    pub const ALL: [CheckStatus; 5] = [
        CheckStatus::Pass,
        CheckStatus::Info,
        CheckStatus::Skip,
        CheckStatus::Warn,
        CheckStatus::Fail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Info => "INFO",
            CheckStatus::Skip => "SKIP",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl Default for CheckStatus {
    fn default() -> Self {
        CheckStatus::Pass
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown check status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for CheckStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// OR-accumulator of statuses seen while reconciling a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSet(u8);

impl StatusSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, status: CheckStatus) {
        self.0 |= status.bit();
    }

    pub fn contains(&self, status: CheckStatus) -> bool {
        self.0 & status.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Highest severity folded in so far.
    pub fn worst(&self) -> Option<CheckStatus> {
        CheckStatus::ALL
            .into_iter()
            .rev()
            .find(|status| self.contains(*status))
    }
}

impl FromIterator<CheckStatus> for StatusSet {
    fn from_iter<I: IntoIterator<Item = CheckStatus>>(iter: I) -> Self {
        let mut set = StatusSet::new();
        for status in iter {
            set.insert(status);
        }
        set
    }
}

/// Per-status counters, as tallied per collection and per device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts(BTreeMap<CheckStatus, usize>);

impl StatusCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, status: CheckStatus) {
        *self.0.entry(status).or_insert(0) += 1;
    }

    pub fn get(&self, status: CheckStatus) -> usize {
        self.0.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn merge(&mut self, other: &StatusCounts) {
        for (status, count) in &other.0 {
            *self.0.entry(*status).or_insert(0) += count;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CheckStatus, usize)> + '_ {
        self.0.iter().map(|(status, count)| (*status, *count))
    }

    /// One-line summary, e.g. `PASS: 2, FAIL: 1`.
    pub fn summary(&self) -> String {
        if self.0.is_empty() {
            return "no results".to_string();
        }
        self.iter()
            .map(|(status, count)| format!("{}: {}", status, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> FromIterator<&'a CheckStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a CheckStatus>>(iter: I) -> Self {
        let mut counts = StatusCounts::new();
        for status in iter {
            counts.add(*status);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(CheckStatus::Pass < CheckStatus::Info);
        assert!(CheckStatus::Info < CheckStatus::Skip);
        assert!(CheckStatus::Skip < CheckStatus::Warn);
        assert!(CheckStatus::Warn < CheckStatus::Fail);
    }

    #[test]
    fn test_status_parse_and_serde() {
        assert_eq!("fail".parse::<CheckStatus>().unwrap(), CheckStatus::Fail);
        assert!("BROKEN".parse::<CheckStatus>().is_err());
        assert_eq!(serde_json::to_string(&CheckStatus::Warn).unwrap(), "\"WARN\"");
    }

    #[test]
    fn test_status_set_worst() {
        let set: StatusSet = [CheckStatus::Info, CheckStatus::Warn].into_iter().collect();
        assert!(set.contains(CheckStatus::Warn));
        assert!(!set.contains(CheckStatus::Fail));
        assert_eq!(set.worst(), Some(CheckStatus::Warn));
        assert_eq!(StatusSet::new().worst(), None);
    }

    #[test]
    fn test_counts_summary() {
        let counts: StatusCounts = [CheckStatus::Pass, CheckStatus::Fail, CheckStatus::Pass]
            .iter()
            .collect();
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.summary(), "PASS: 2, FAIL: 1");

        let mut merged = StatusCounts::new();
        merged.merge(&counts);
        merged.add(CheckStatus::Skip);
        assert_eq!(merged.get(CheckStatus::Pass), 2);
        assert_eq!(merged.get(CheckStatus::Skip), 1);
    }
}
