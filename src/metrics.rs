//! Per-tool invocation metrics.
//!
//! The collector aggregates invocation counts, success/failure outcomes, and
//! latency figures for every tool the server dispatches. It is owned by the
//! server instance rather than living in a process-wide global, so tests can
//! construct isolated collectors.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{json, Value};

/// Aggregated statistics for a single tool.
///
/// Created lazily on the tool's first invocation and updated on every later
/// one; records are never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStats {
    /// Tool name this record belongs to.
    pub name: String,
    /// Total number of invocations. Always `successes + failures`.
    pub invocations: u64,
    /// Invocations whose handler returned a result.
    pub successes: u64,
    /// Invocations whose handler returned an error.
    pub failures: u64,
    /// Sum of all invocation latencies.
    pub total_latency: Duration,
    /// `total_latency / invocations`, truncated to the duration's resolution.
    pub avg_latency: Duration,
    /// Shortest invocation seen so far.
    pub min_latency: Duration,
    /// Longest invocation seen so far.
    pub max_latency: Duration,
    /// Wall-clock time of the most recent invocation.
    pub last_invoked_at: SystemTime,
}

impl ToolStats {
    /// Renders this record as a JSON object with millisecond latencies.
    pub fn to_json(&self) -> Value {
        let last = self
            .last_invoked_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        json!({
            "name": self.name,
            "invocations": self.invocations,
            "successes": self.successes,
            "failures": self.failures,
            "total_latency_ms": self.total_latency.as_millis() as u64,
            "avg_latency_ms": self.avg_latency.as_millis() as u64,
            "min_latency_ms": self.min_latency.as_millis() as u64,
            "max_latency_ms": self.max_latency.as_millis() as u64,
            "last_invoked_at_epoch_ms": last.as_millis() as u64,
        })
    }
}

/// Roll-up across all tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_invocations: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    /// Percentage of successful invocations, in `[0, 100]`. Zero when
    /// nothing has been recorded yet.
    pub success_rate_pct: f64,
    /// Mean latency in whole milliseconds. Zero when nothing has been
    /// recorded yet.
    pub avg_latency_ms: u64,
    /// Number of distinct tools that have been invoked at least once.
    pub tools_count: usize,
}

#[derive(Debug, Default)]
struct MetricsState {
    per_tool: HashMap<String, ToolStats>,
    total_invocations: u64,
    total_successes: u64,
    total_failures: u64,
    total_latency: Duration,
}

/// Thread-safe, purely additive aggregator of invocation outcomes.
///
/// Reads (`tool_stats`, `all_stats`, `summary`) may proceed concurrently;
/// each `record` takes the write half of the lock and excludes all other
/// access. The current stdio transport dispatches sequentially, but tool
/// handlers may spawn concurrent work that records on its own.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    state: RwLock<MetricsState>,
}

impl MetricsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one invocation outcome for `tool`.
    pub fn record(&self, tool: &str, duration: Duration, success: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        state.total_invocations += 1;
        state.total_latency += duration;
        if success {
            state.total_successes += 1;
        } else {
            state.total_failures += 1;
        }

        let now = SystemTime::now();
        let stats = state
            .per_tool
            .entry(tool.to_string())
            .or_insert_with(|| ToolStats {
                name: tool.to_string(),
                invocations: 0,
                successes: 0,
                failures: 0,
                total_latency: Duration::ZERO,
                avg_latency: Duration::ZERO,
                min_latency: duration,
                max_latency: duration,
                last_invoked_at: now,
            });

        stats.invocations += 1;
        stats.total_latency += duration;
        stats.avg_latency = Duration::from_nanos(
            (stats.total_latency.as_nanos() / stats.invocations as u128) as u64,
        );
        if duration < stats.min_latency {
            stats.min_latency = duration;
        }
        if duration > stats.max_latency {
            stats.max_latency = duration;
        }
        stats.last_invoked_at = now;
        if success {
            stats.successes += 1;
        } else {
            stats.failures += 1;
        }
    }

    /// Returns a copy of the stats for `tool`, if it has ever been invoked.
    pub fn tool_stats(&self, tool: &str) -> Option<ToolStats> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.per_tool.get(tool).cloned()
    }

    /// Returns a copy of every per-tool record, keyed by tool name.
    pub fn all_stats(&self) -> HashMap<String, ToolStats> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.per_tool.clone()
    }

    /// Computes the cross-tool roll-up.
    pub fn summary(&self) -> MetricsSummary {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let (success_rate_pct, avg_latency_ms) = if state.total_invocations == 0 {
            (0.0, 0)
        } else {
            (
                100.0 * state.total_successes as f64 / state.total_invocations as f64,
                state.total_latency.as_millis() as u64 / state.total_invocations,
            )
        };
        MetricsSummary {
            total_invocations: state.total_invocations,
            total_successes: state.total_successes,
            total_failures: state.total_failures,
            success_rate_pct,
            avg_latency_ms,
            tools_count: state.per_tool.len(),
        }
    }

    /// Zeroes every counter and empties the per-tool map. Test isolation only.
    pub fn reset(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = MetricsState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_record_sets_min_max() {
        let m = MetricsCollector::new();
        m.record("resize_image", Duration::from_millis(40), true);

        let stats = m.tool_stats("resize_image").unwrap();
        assert_eq!(stats.invocations, 1);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.min_latency, Duration::from_millis(40));
        assert_eq!(stats.max_latency, Duration::from_millis(40));
        assert_eq!(stats.avg_latency, Duration::from_millis(40));
    }

    #[test]
    fn test_invocations_equals_successes_plus_failures() {
        let m = MetricsCollector::new();
        m.record("crop_image", Duration::from_millis(10), true);
        m.record("crop_image", Duration::from_millis(20), false);
        m.record("crop_image", Duration::from_millis(30), true);

        let stats = m.tool_stats("crop_image").unwrap();
        assert_eq!(stats.invocations, 3);
        assert_eq!(stats.successes + stats.failures, stats.invocations);
        assert_eq!(stats.total_latency, Duration::from_millis(60));
        assert_eq!(stats.avg_latency, Duration::from_millis(20));
        assert_eq!(stats.min_latency, Duration::from_millis(10));
        assert_eq!(stats.max_latency, Duration::from_millis(30));
    }

    #[test]
    fn test_avg_latency_truncates_at_nanosecond_resolution() {
        let m = MetricsCollector::new();
        m.record("resize_image", Duration::from_millis(10), true);
        m.record("resize_image", Duration::from_millis(10), true);
        m.record("resize_image", Duration::from_millis(11), true);

        // 31ms over 3 invocations: 10_333_333ns, remainder dropped.
        let stats = m.tool_stats("resize_image").unwrap();
        assert_eq!(stats.avg_latency, Duration::from_nanos(10_333_333));
    }

    #[test]
    fn test_unknown_tool_has_no_stats() {
        let m = MetricsCollector::new();
        assert!(m.tool_stats("generate_image").is_none());
    }

    #[test]
    fn test_summary_zero_safe() {
        let m = MetricsCollector::new();
        let summary = m.summary();
        assert_eq!(summary.total_invocations, 0);
        assert_eq!(summary.success_rate_pct, 0.0);
        assert_eq!(summary.avg_latency_ms, 0);
        assert_eq!(summary.tools_count, 0);
    }

    #[test]
    fn test_summary_mixed_outcomes() {
        let m = MetricsCollector::new();
        m.record("resize_image", Duration::from_millis(10), true);
        m.record("resize_image", Duration::from_millis(30), false);
        m.record("convert_image", Duration::from_millis(20), true);

        let summary = m.summary();
        assert_eq!(summary.total_invocations, 3);
        assert_eq!(summary.total_successes, 2);
        assert_eq!(summary.total_failures, 1);
        assert!(summary.success_rate_pct > 66.0 && summary.success_rate_pct < 67.0);
        assert_eq!(summary.avg_latency_ms, 20);
        assert_eq!(summary.tools_count, 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let m = MetricsCollector::new();
        m.record("resize_image", Duration::from_millis(10), true);
        m.reset();

        assert!(m.all_stats().is_empty());
        let summary = m.summary();
        assert_eq!(summary.total_invocations, 0);
        assert_eq!(summary.success_rate_pct, 0.0);
    }

    #[test]
    fn test_returned_stats_are_copies() {
        let m = MetricsCollector::new();
        m.record("resize_image", Duration::from_millis(10), true);

        let mut copy = m.tool_stats("resize_image").unwrap();
        copy.invocations = 999;

        assert_eq!(m.tool_stats("resize_image").unwrap().invocations, 1);
    }

    #[test]
    fn test_stats_json_fields() {
        let m = MetricsCollector::new();
        m.record("resize_image", Duration::from_millis(15), true);

        let json = m.tool_stats("resize_image").unwrap().to_json();
        assert_eq!(json["name"], "resize_image");
        assert_eq!(json["invocations"], 1);
        assert_eq!(json["avg_latency_ms"], 15);
    }
}
