use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

const RING_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct LatencyPercentiles {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub samples: usize,
}

/// Process-wide, thread-safe collector of per-operation latency samples. A
/// bounded deque per operation name keeps memory flat regardless of run
/// length; oldest samples are evicted first (spec.md §4.8). Named hot
/// paths: `dag.build`, `sql.normalize`, `sql.ast_diff`, `sql.hash`,
/// `sql.rewrite`.
#[derive(Default)]
pub struct Profiler {
    samples: Mutex<BTreeMap<String, VecDeque<Duration>>>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operation: &str, duration: Duration) {
        let mut samples = self.samples.lock();
        let deque = samples.entry(operation.to_string()).or_default();
        if deque.len() >= RING_CAPACITY {
            deque.pop_front();
        }
        deque.push_back(duration);
    }

    /// Times `f` and records its duration under `operation`, returning `f`'s
    /// result unchanged.
    pub fn time<T>(&self, operation: &str, f: impl FnOnce() -> T) -> T {
        let start = std::time::Instant::now();
        let result = f();
        self.record(operation, start.elapsed());
        result
    }

    pub fn percentiles(&self, operation: &str) -> LatencyPercentiles {
        let samples = self.samples.lock();
        let Some(deque) = samples.get(operation) else {
            return LatencyPercentiles::default();
        };
        if deque.is_empty() {
            return LatencyPercentiles::default();
        }
        let mut sorted: Vec<f64> = deque.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        LatencyPercentiles {
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            samples: sorted.len(),
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_known_samples() {
        let profiler = Profiler::new();
        for ms in 1..=100u64 {
            profiler.record("dag.build", Duration::from_millis(ms));
        }
        let p = profiler.percentiles("dag.build");
        assert_eq!(p.samples, 100);
        assert!((p.p50_ms - 50.0).abs() < 2.0);
        assert!(p.p95_ms >= p.p50_ms);
        assert!(p.p99_ms >= p.p95_ms);
    }

    #[test]
    fn ring_buffer_evicts_oldest_past_capacity() {
        let profiler = Profiler::new();
        for ms in 0..(RING_CAPACITY as u64 + 10) {
            profiler.record("sql.normalize", Duration::from_millis(ms));
        }
        assert_eq!(profiler.percentiles("sql.normalize").samples, RING_CAPACITY);
    }
}
