use crate::planner::cost::{estimate_usd, heuristic_runtime_seconds};

#[derive(Debug, Clone, Copy)]
pub struct CostFeatures8 {
    pub partitions: f64,
    pub log_data_volume: f64,
    pub workers: f64,
    pub sql_complexity: f64,
    pub join_count: f64,
    pub cte_count: f64,
    pub window_usage: f64,
    pub distinct_tables: f64,
}

impl CostFeatures8 {
    fn as_array(self) -> [f64; 8] {
        [
            self.partitions,
            self.log_data_volume,
            self.workers,
            self.sql_complexity,
            self.join_count,
            self.cte_count,
            self.window_usage,
            self.distinct_tables,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrainedCostModel {
    pub weights: [f64; 8],
    pub bias: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn band_fraction(self) -> f64 {
        match self {
            Confidence::High => 0.05,
            Confidence::Medium => 0.15,
            Confidence::Low => 0.30,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CostPrediction {
    pub runtime_seconds: f64,
    pub estimated_usd: f64,
    pub confidence: Confidence,
    pub band_low_usd: f64,
    pub band_high_usd: f64,
}

/// Predicts runtime/cost from an 8-feature linear regression when a
/// trained model is supplied; falls back to the deterministic planner
/// heuristic otherwise (spec.md §4.6, reusing the same fallback formula
/// as spec.md §4.4 step 8 so the two code paths never disagree on what
/// "heuristic" means).
pub fn predict_cost(
    features: CostFeatures8,
    trained: Option<&TrainedCostModel>,
    cost_per_second_usd: f64,
) -> CostPrediction {
    let (runtime_seconds, confidence) = match trained {
        Some(model) => {
            let x = features.as_array();
            let dot: f64 = model.weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum();
            ((dot + model.bias).max(1.0), Confidence::High)
        }
        None => {
            let partitions = features.partitions.round().max(1.0) as u32;
            let workers = features.workers.round().max(1.0) as u32;
            let data_volume_gb = features.log_data_volume.exp() - 1.0;
            (
                heuristic_runtime_seconds(partitions, data_volume_gb.max(0.0), workers),
                Confidence::Low,
            )
        }
    };

    let estimated_usd = estimate_usd(runtime_seconds, cost_per_second_usd);
    let band = estimated_usd * confidence.band_fraction();

    CostPrediction {
        runtime_seconds,
        estimated_usd,
        confidence,
        band_low_usd: (estimated_usd - band).max(0.0),
        band_high_usd: estimated_usd + band,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_features() -> CostFeatures8 {
        CostFeatures8 {
            partitions: 10.0,
            log_data_volume: 2.0,
            workers: 8.0,
            sql_complexity: 3.0,
            join_count: 2.0,
            cte_count: 1.0,
            window_usage: 0.0,
            distinct_tables: 3.0,
        }
    }

    #[test]
    fn heuristic_fallback_has_low_confidence_and_wide_band() {
        let prediction = predict_cost(sample_features(), None, 0.002);
        assert_eq!(prediction.confidence, Confidence::Low);
        assert!(prediction.band_high_usd > prediction.band_low_usd);
    }

    #[test]
    fn trained_model_has_high_confidence_and_narrow_band() {
        let model = TrainedCostModel {
            weights: [10.0, 5.0, -2.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            bias: 100.0,
        };
        let prediction = predict_cost(sample_features(), Some(&model), 0.002);
        assert_eq!(prediction.confidence, Confidence::High);
        let band_fraction = (prediction.band_high_usd - prediction.estimated_usd) / prediction.estimated_usd;
        assert!((band_fraction - 0.05).abs() < 1e-9);
    }
}
