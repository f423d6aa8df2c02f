/// Inputs to the composite risk score, all pre-computed by the caller
/// (spec.md §4.6): the advisory engine itself never touches the DAG or
/// warehouse directly.
#[derive(Debug, Clone, Copy)]
pub struct RiskInputs {
    pub downstream_depth: u32,
    pub has_sla_tag: bool,
    pub dashboard_dependents: u32,
    pub historical_failure_rate: f64,
    pub has_critical_tag: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RiskScore {
    pub score: f64,
    pub approval_required: bool,
    pub business_critical: bool,
}

const APPROVAL_THRESHOLD: f64 = 6.0;
const CRITICAL_THRESHOLD: f64 = 8.0;

/// Composite 0-10 risk score from downstream depth, SLA tags, dashboard
/// dependents, historical failure rate, and critical tags. Deterministic
/// and pure: identical inputs always produce an identical score
/// (spec.md §4.6, §6 "deterministic scorers produce identical outputs
/// bit-for-bit").
pub fn score_risk(inputs: RiskInputs) -> RiskScore {
    let depth_component = (inputs.downstream_depth as f64 * 0.8).min(3.0);
    let sla_component = if inputs.has_sla_tag { 2.0 } else { 0.0 };
    let dashboard_component = (inputs.dashboard_dependents as f64 * 0.3).min(2.0);
    let failure_component = inputs.historical_failure_rate.clamp(0.0, 1.0) * 2.0;
    let critical_component = if inputs.has_critical_tag { 1.0 } else { 0.0 };

    let raw = depth_component + sla_component + dashboard_component + failure_component + critical_component;
    let score = raw.clamp(0.0, 10.0);

    RiskScore {
        score,
        approval_required: score >= APPROVAL_THRESHOLD,
        business_critical: score >= CRITICAL_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_identical_inputs() {
        let inputs = RiskInputs {
            downstream_depth: 3,
            has_sla_tag: true,
            dashboard_dependents: 4,
            historical_failure_rate: 0.1,
            has_critical_tag: false,
        };
        assert_eq!(score_risk(inputs).score, score_risk(inputs).score);
    }

    #[test]
    fn clamps_to_ten_even_with_extreme_inputs() {
        let inputs = RiskInputs {
            downstream_depth: 100,
            has_sla_tag: true,
            dashboard_dependents: 100,
            historical_failure_rate: 1.0,
            has_critical_tag: true,
        };
        assert_eq!(score_risk(inputs).score, 10.0);
        assert!(score_risk(inputs).business_critical);
    }

    #[test]
    fn low_risk_inputs_do_not_require_approval() {
        let inputs = RiskInputs {
            downstream_depth: 0,
            has_sla_tag: false,
            dashboard_dependents: 0,
            historical_failure_rate: 0.0,
            has_critical_tag: false,
        };
        let result = score_risk(inputs);
        assert!(!result.approval_required);
        assert!(!result.business_critical);
    }
}
