//! Per-tool call counters shared by every instrumented handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use super::snapshot::{MetricsSnapshot, ToolStats};

/// Atomic counters for a single tool.
#[derive(Debug, Default)]
pub struct ToolCounters {
    calls: AtomicU64,
    errors: AtomicU64,
    duration_ns: AtomicU64,
}

impl ToolCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `elapsed` to the running total. The total saturates at
    /// `u64::MAX` nanoseconds and never decreases.
    #[inline]
    pub fn record_duration(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        // The closure always returns Some, so the update cannot fail.
        let _ = self
            .duration_ns
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some(total.saturating_add(nanos))
            });
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_nanos(self.duration_ns.load(Ordering::Relaxed))
    }

    /// Loads each field atomically. The triple as a whole is not a
    /// transaction.
    pub fn stats(&self) -> ToolStats {
        ToolStats {
            calls: self.calls(),
            errors: self.errors(),
            total_duration: self.total_duration(),
        }
    }
}

/// Registry mapping tool names to their counters.
///
/// Entries are created lazily on first reference and live as long as the
/// registry. Construct one per server and share it with `Arc`:
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use interbase::metrics::MetricsRegistry;
///
/// let registry = Arc::new(MetricsRegistry::new());
/// registry.record_call("search");
/// registry.record_duration("search", Duration::from_millis(3));
///
/// let stats = registry.snapshot().get("search").cloned().unwrap();
/// assert_eq!(stats.calls, 1);
/// assert_eq!(stats.errors, 0);
/// ```
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    tools: RwLock<HashMap<String, Arc<ToolCounters>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counters for `name`, creating them on first use.
    ///
    /// Exactly one `ToolCounters` is ever associated with a name, even when
    /// many callers race to create it.
    pub fn counters_for(&self, name: &str) -> Arc<ToolCounters> {
        {
            let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(counters) = tools.get(name) {
                return Arc::clone(counters);
            }
        }

        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have inserted while we waited for the write lock.
        if let Some(counters) = tools.get(name) {
            return Arc::clone(counters);
        }
        tracing::trace!(tool = name, "registering tool counters");
        let counters = Arc::new(ToolCounters::new());
        tools.insert(name.to_string(), Arc::clone(&counters));
        counters
    }

    pub fn record_call(&self, name: &str) {
        self.counters_for(name).record_call();
    }

    pub fn record_error(&self, name: &str) {
        self.counters_for(name).record_error();
    }

    pub fn record_duration(&self, name: &str, elapsed: Duration) {
        self.counters_for(name).record_duration(elapsed);
    }

    /// Copies every tool's counters as observed now.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let tools = self.tools.read().unwrap_or_else(PoisonError::into_inner);
        tools
            .iter()
            .map(|(name, counters)| (name.clone(), counters.stats()))
            .collect()
    }

    /// Number of tools seen so far.
    pub fn len(&self) -> usize {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. Counters already handed out keep working but are
    /// no longer reachable from the registry.
    pub fn reset(&self) {
        self.tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_counters_start_at_zero() {
        let registry = MetricsRegistry::new();
        let counters = registry.counters_for("search");
        assert_eq!(counters.calls(), 0);
        assert_eq!(counters.errors(), 0);
        assert_eq!(counters.total_duration(), Duration::ZERO);
    }

    #[test]
    fn test_counters_for_returns_same_instance() {
        let registry = MetricsRegistry::new();
        let first = registry.counters_for("search");
        let second = registry.counters_for("search");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_operations() {
        let registry = MetricsRegistry::new();
        registry.record_call("search");
        registry.record_call("search");
        registry.record_error("search");
        registry.record_duration("search", Duration::from_millis(5));
        registry.record_duration("search", Duration::from_millis(7));

        let stats = registry.counters_for("search").stats();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_duration, Duration::from_millis(12));
    }

    #[test]
    fn test_huge_duration_saturates() {
        let counters = ToolCounters::new();
        counters.record_duration(Duration::MAX);
        assert_eq!(counters.total_duration(), Duration::from_nanos(u64::MAX));

        counters.record_duration(Duration::from_secs(1));
        assert_eq!(counters.total_duration(), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn test_total_duration_never_decreases_near_limit() {
        let registry = MetricsRegistry::new();
        registry.record_duration("t", Duration::from_nanos(u64::MAX - 10));
        let before = registry.snapshot().get("t").unwrap().total_duration;

        registry.record_duration("t", Duration::from_secs(1));
        let after = registry.snapshot().get("t").unwrap().total_duration;
        assert!(after >= before);
        assert_eq!(after, Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn test_racing_creation_yields_single_instance() {
        let registry = Arc::new(MetricsRegistry::new());
        let threads = 32;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let counters = registry.counters_for("contended");
                    counters.record_call();
                    counters
                })
            })
            .collect();

        let all: Vec<Arc<ToolCounters>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for counters in &all {
            assert!(Arc::ptr_eq(counters, &all[0]));
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(all[0].calls(), threads as u64);
    }

    #[test]
    fn test_concurrent_increments_not_lost() {
        let registry = Arc::new(MetricsRegistry::new());
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        registry.record_call("hot");
                        registry.record_error("hot");
                    }
                });
            }
        });
        let stats = registry.counters_for("hot").stats();
        assert_eq!(stats.calls, 8000);
        assert_eq!(stats.errors, 8000);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let registry = MetricsRegistry::new();
        registry.record_call("a");
        let before = registry.snapshot();

        registry.record_call("a");
        registry.record_call("b");

        assert_eq!(before.get("a").map(|s| s.calls), Some(1));
        assert!(before.get("b").is_none());

        let after = registry.snapshot();
        assert_eq!(after.get("a").map(|s| s.calls), Some(2));
        assert_eq!(after.get("b").map(|s| s.calls), Some(1));
    }

    #[test]
    fn test_reset_clears_entries() {
        let registry = MetricsRegistry::new();
        registry.record_call("a");
        assert!(!registry.is_empty());
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_poisoned_lock_still_usable() {
        let registry = Arc::new(MetricsRegistry::new());
        registry.record_call("before");

        let poisoner = Arc::clone(&registry);
        let _ = thread::spawn(move || {
            let _guard = poisoner.tools.write().unwrap();
            panic!("poison the registry lock");
        })
        .join();

        registry.record_call("after");
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.get("before").map(|s| s.calls), Some(1));
        assert_eq!(snapshot.get("after").map(|s| s.calls), Some(1));
    }
}
