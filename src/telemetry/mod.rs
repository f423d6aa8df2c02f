//! Metering & telemetry: a buffered event collector, PII scrubbing,
//! per-hot-path profiling, and the retention/aggregation job
//! (spec.md §4.8).
//!
//! Grounded in the teacher's `src/monitoring` (metrics.rs,
//! metrics_aggregator.rs, profiler.rs) and `src/audit/audit_logger.rs`'s
//! async-buffered-flush pattern.

mod aggregation;
mod collector;
mod profiler;

pub mod pii;

pub use aggregation::{aggregate, is_within_retention, AggregateRecord, RunObservation};
pub use collector::{MeteringCollector, MeteringEvent, MetricSink, NullSink, RecordingSink};
pub use profiler::{LatencyPercentiles, Profiler};
