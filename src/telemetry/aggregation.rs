use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One raw run observation fed into the aggregation job.
#[derive(Debug, Clone)]
pub struct RunObservation {
    pub tenant_id: Uuid,
    pub model: String,
    pub bucket_epoch_secs: i64,
    pub runtime_seconds: f64,
    pub shuffle_bytes: u64,
    pub rows: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub tenant_id: Uuid,
    pub model: String,
    pub bucket_epoch_secs: i64,
    pub run_count: u64,
    pub avg_runtime_seconds: f64,
    pub total_shuffle_bytes: u64,
    pub total_rows: u64,
    pub p50_runtime_seconds: f64,
    pub p95_runtime_seconds: f64,
}

/// Groups raw observations by `(tenant, model, bucket)` and computes the
/// record spec.md §4.8 calls for: run count, average runtime, total
/// shuffle, total rows, p50/p95 runtime. The caller decides the bucket
/// width (hour or day) by how it buckets `bucket_epoch_secs` beforehand.
pub fn aggregate(observations: &[RunObservation]) -> Vec<AggregateRecord> {
    let mut groups: BTreeMap<(Uuid, String, i64), Vec<&RunObservation>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry((obs.tenant_id, obs.model.clone(), obs.bucket_epoch_secs))
            .or_default()
            .push(obs);
    }

    let mut records = Vec::with_capacity(groups.len());
    for ((tenant_id, model, bucket), obs_group) in groups {
        let mut runtimes: Vec<f64> = obs_group.iter().map(|o| o.runtime_seconds).collect();
        runtimes.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let run_count = obs_group.len() as u64;
        let total_runtime: f64 = runtimes.iter().sum();
        records.push(AggregateRecord {
            tenant_id,
            model,
            bucket_epoch_secs: bucket,
            run_count,
            avg_runtime_seconds: total_runtime / run_count as f64,
            total_shuffle_bytes: obs_group.iter().map(|o| o.shuffle_bytes).sum(),
            total_rows: obs_group.iter().map(|o| o.rows).sum(),
            p50_runtime_seconds: percentile(&runtimes, 0.50),
            p95_runtime_seconds: percentile(&runtimes, 0.95),
        });
    }
    records
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Retention policy (spec.md §4.8): raw events default to 30 days, hourly
/// aggregates to 365, daily aggregates indefinitely. Returns whether a
/// record at `record_age_days` should be retained at the given tier.
pub fn is_within_retention(record_age_days: u32, retention_days: Option<u32>) -> bool {
    match retention_days {
        None => true,
        Some(limit) => record_age_days <= limit,
    }
}
