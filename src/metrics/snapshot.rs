//! Point-in-time copies of the registry.

use serde::{Serialize, Serializer};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Snapshot of metrics for a single tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolStats {
    /// Invocations attempted, including failed ones
    pub calls: u64,
    /// Invocations that ended in an error result or a contained panic
    pub errors: u64,
    /// Cumulative wall-clock time spent in the handler
    #[serde(rename = "total_duration_ns", serialize_with = "serialize_nanos")]
    pub total_duration: Duration,
}

impl ToolStats {
    /// Mean time per call, or zero before the first call.
    pub fn average_duration(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(calls) => self.total_duration / calls,
            Err(_) => Duration::from_secs_f64(self.total_duration.as_secs_f64() / self.calls as f64),
        }
    }

    /// Fraction of calls that failed, in `0.0..=1.0`.
    pub fn error_rate(&self) -> f64 {
        if self.calls == 0 {
            return 0.0;
        }
        self.errors as f64 / self.calls as f64
    }
}

impl fmt::Display for ToolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "calls={} errors={} duration={:?}",
            self.calls, self.errors, self.total_duration
        )
    }
}

fn serialize_nanos<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

/// Immutable copy of every tool's counters, keyed by tool name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetricsSnapshot {
    tools: BTreeMap<String, ToolStats>,
}

impl MetricsSnapshot {
    pub fn get(&self, name: &str) -> Option<&ToolStats> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterates tools in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ToolStats> {
        self.tools.iter()
    }

    /// Sums the counters of every tool.
    pub fn totals(&self) -> ToolStats {
        self.tools.values().fold(ToolStats::default(), |acc, stats| ToolStats {
            calls: acc.calls.saturating_add(stats.calls),
            errors: acc.errors.saturating_add(stats.errors),
            total_duration: acc.total_duration.saturating_add(stats.total_duration),
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl FromIterator<(String, ToolStats)> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, ToolStats)>>(iter: I) -> Self {
        Self {
            tools: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MetricsSnapshot {
    type Item = (&'a String, &'a ToolStats);
    type IntoIter = btree_map::Iter<'a, String, ToolStats>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.iter()
    }
}
