use crate::error::{IronlayerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy)]
pub struct Forecast {
    pub smoothed_level: f64,
    pub projection_7d: f64,
    pub projection_30d: f64,
    pub trend: Trend,
    pub band_width_95: f64,
}

const ALPHA: f64 = 0.3;
const STABLE_SLOPE_THRESHOLD: f64 = 0.01;

/// Simple exponential smoothing `S_t = alpha*Y_t + (1-alpha)*S_{t-1}` over
/// a daily cost series, with 7/30-day flat projections from the final
/// smoothed level and a +/-1.96*sigma*sqrt(7) 95% band (spec.md §4.6).
pub fn forecast_cost(daily_costs: &[f64]) -> Result<Forecast> {
    if daily_costs.is_empty() {
        return Err(IronlayerError::Validation(
            "cost forecasting requires at least one historical day".to_string(),
        ));
    }

    let mut smoothed = daily_costs[0];
    for &y in &daily_costs[1..] {
        smoothed = ALPHA * y + (1.0 - ALPHA) * smoothed;
    }

    let mean = daily_costs.iter().sum::<f64>() / daily_costs.len() as f64;
    let variance = daily_costs.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / daily_costs.len() as f64;
    let sigma = variance.sqrt();
    let band_width_95 = 1.96 * sigma * 7.0f64.sqrt();

    let trend = if daily_costs.len() < 2 {
        Trend::Stable
    } else {
        let first_half_end = daily_costs.len() / 2;
        let first_half_mean = daily_costs[..first_half_end].iter().sum::<f64>() / first_half_end.max(1) as f64;
        let second_half_mean =
            daily_costs[first_half_end..].iter().sum::<f64>() / (daily_costs.len() - first_half_end) as f64;
        let relative_slope = if first_half_mean.abs() > f64::EPSILON {
            (second_half_mean - first_half_mean) / first_half_mean.abs()
        } else {
            0.0
        };
        if relative_slope > STABLE_SLOPE_THRESHOLD {
            Trend::Increasing
        } else if relative_slope < -STABLE_SLOPE_THRESHOLD {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    };

    Ok(Forecast {
        smoothed_level: smoothed,
        projection_7d: smoothed,
        projection_30d: smoothed,
        trend,
        band_width_95,
    })
}
