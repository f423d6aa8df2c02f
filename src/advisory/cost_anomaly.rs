use crate::error::{IronlayerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalySeverity {
    None,
    Minor,
    Major,
    Critical,
}

#[derive(Debug, Clone, Copy)]
pub struct AnomalyReport {
    pub z_score: f64,
    pub percentile: f64,
    pub severity: AnomalySeverity,
    pub lower_fence: f64,
    pub upper_fence: f64,
}

/// Given a history of at least 3 points and a latest value, computes the
/// Z-score and IQR fences and classifies the latest value's severity by
/// `|Z|` (spec.md §4.6).
pub fn detect_anomaly(history: &[f64], latest: f64) -> Result<AnomalyReport> {
    if history.len() < 3 {
        return Err(IronlayerError::Validation(
            "cost anomaly detection requires a history of at least 3 points".to_string(),
        ));
    }

    let mean = history.iter().sum::<f64>() / history.len() as f64;
    let variance = history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / history.len() as f64;
    let stddev = variance.sqrt();
    let z_score = if stddev > 0.0 { (latest - mean) / stddev } else { 0.0 };

    let mut sorted: Vec<f64> = history.to_vec();
    sorted.push(latest);
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let rank = sorted.iter().filter(|&&v| v <= latest).count();
    let percentile = rank as f64 / sorted.len() as f64 * 100.0;

    let abs_z = z_score.abs();
    let severity = if abs_z < 1.5 {
        AnomalySeverity::None
    } else if abs_z < 2.5 {
        AnomalySeverity::Minor
    } else if abs_z < 4.0 {
        AnomalySeverity::Major
    } else {
        AnomalySeverity::Critical
    };

    Ok(AnomalyReport {
        z_score,
        percentile,
        severity,
        lower_fence,
        upper_fence,
    })
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_history_shorter_than_three() {
        let err = detect_anomaly(&[1.0, 2.0], 3.0).unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }

    #[test]
    fn stable_history_reports_no_anomaly() {
        let history = vec![100.0, 101.0, 99.0, 100.0, 100.5];
        let report = detect_anomaly(&history, 100.2).unwrap();
        assert_eq!(report.severity, AnomalySeverity::None);
    }

    #[test]
    fn extreme_spike_is_critical() {
        let history = vec![100.0, 101.0, 99.0, 100.0, 100.5];
        let report = detect_anomaly(&history, 10_000.0).unwrap();
        assert_eq!(report.severity, AnomalySeverity::Critical);
    }
}
