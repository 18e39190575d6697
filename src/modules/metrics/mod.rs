//! Metrics collection utilities.
//!
//! Provides aggregated global and per-adapter statistics with fill latency
//! percentiles for observability.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Aggregated metrics across all adapters.
#[derive(Debug, Clone)]
pub struct GlobalStats {
    pub started_at: DateTime<Utc>,
    pub requests: u64,
    pub fills: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub resolution_failures: u64,
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            requests: 0,
            fills: 0,
            failures: 0,
            timeouts: 0,
            resolution_failures: 0,
        }
    }
}

/// Adapter-scoped metrics snapshot.
#[derive(Debug, Clone)]
pub struct AdapterStats {
    pub adapter: String,
    pub requests: u64,
    pub fills: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub average_fill_latency: Option<Duration>,
    pub p95_fill_latency: Option<Duration>,
    pub consecutive_failures: u32,
}

impl AdapterStats {
    fn from_accumulator(adapter: &str, acc: &AdapterAccumulator) -> Self {
        let (avg, p95) = acc.latency_stats();
        Self {
            adapter: adapter.to_string(),
            requests: acc.requests,
            fills: acc.fills,
            failures: acc.failures,
            timeouts: acc.timeouts,
            average_fill_latency: avg,
            p95_fill_latency: p95,
            consecutive_failures: acc.consecutive_failures,
        }
    }

    /// Share of started loads that produced an ad.
    pub fn fill_rate(&self) -> Option<f64> {
        (self.requests > 0).then(|| self.fills as f64 / self.requests as f64)
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub global: GlobalStats,
    pub adapters: Vec<AdapterStats>,
}

impl MetricsSnapshot {
    pub fn adapter(&self, name: &str) -> Option<&AdapterStats> {
        self.adapters.iter().find(|stats| stats.adapter == name)
    }
}

#[derive(Debug)]
struct AdapterAccumulator {
    requests: u64,
    fills: u64,
    failures: u64,
    timeouts: u64,
    latencies: VecDeque<Duration>,
    max_window: usize,
    consecutive_failures: u32,
}

impl AdapterAccumulator {
    fn new(max_window: usize) -> Self {
        Self {
            requests: 0,
            fills: 0,
            failures: 0,
            timeouts: 0,
            latencies: VecDeque::with_capacity(max_window),
            max_window,
            consecutive_failures: 0,
        }
    }

    fn record_fill(&mut self, latency: Option<Duration>) {
        self.fills += 1;
        self.consecutive_failures = 0;

        if let Some(latency) = latency {
            if self.latencies.len() == self.max_window {
                self.latencies.pop_front();
            }
            self.latencies.push_back(latency);
        }
    }

    fn record_miss(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    fn latency_stats(&self) -> (Option<Duration>, Option<Duration>) {
        if self.latencies.is_empty() {
            return (None, None);
        }
        let mut samples: Vec<_> = self.latencies.iter().cloned().collect();
        samples.sort_unstable();
        let avg = samples
            .iter()
            .map(|d| d.as_secs_f64())
            .sum::<f64>()
            / samples.len() as f64;
        let p95_index = ((samples.len() as f64 * 0.95).ceil() as usize).saturating_sub(1);
        let p95 = samples[p95_index];
        (Some(Duration::from_secs_f64(avg)), Some(p95))
    }
}

#[derive(Debug)]
struct MetricsState {
    global: GlobalStats,
    max_window: usize,
    adapters: HashMap<String, AdapterAccumulator>,
}

impl MetricsState {
    fn new(max_window: usize) -> Self {
        Self {
            global: GlobalStats::default(),
            max_window,
            adapters: HashMap::new(),
        }
    }

    fn accumulator_mut(&mut self, adapter: &str) -> &mut AdapterAccumulator {
        self.adapters
            .entry(adapter.to_string())
            .or_insert_with(|| AdapterAccumulator::new(self.max_window))
    }
}

/// Thread-safe metrics collector used by the mediation layer.
#[derive(Clone, Debug)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::new(128))),
        }
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::new(window.max(16)))),
        }
    }

    fn state(&self) -> MutexGuard<'_, MetricsState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_request(&self, adapter: &str) {
        let mut guard = self.state();
        guard.global.requests += 1;
        guard.accumulator_mut(adapter).requests += 1;
    }

    pub fn record_fill(&self, adapter: &str, latency: Option<Duration>) {
        let mut guard = self.state();
        guard.global.fills += 1;
        guard.accumulator_mut(adapter).record_fill(latency);
    }

    pub fn record_failure(&self, adapter: &str) {
        let mut guard = self.state();
        guard.global.failures += 1;
        let acc = guard.accumulator_mut(adapter);
        acc.failures += 1;
        acc.record_miss();
    }

    pub fn record_timeout(&self, adapter: &str) {
        let mut guard = self.state();
        guard.global.timeouts += 1;
        let acc = guard.accumulator_mut(adapter);
        acc.timeouts += 1;
        acc.record_miss();
    }

    /// Unresolvable names are caller supplied; only the global count is kept.
    pub fn record_resolution_failure(&self) {
        self.state().global.resolution_failures += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let guard = self.state();
        let adapters = guard
            .adapters
            .iter()
            .map(|(adapter, acc)| AdapterStats::from_accumulator(adapter, acc))
            .collect();
        MetricsSnapshot {
            global: guard.global.clone(),
            adapters,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
