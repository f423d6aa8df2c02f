use crate::error::{IronlayerError, Result};

/// Checks a usage counter against a period limit before a costly operation
/// (plan generation, AI call) is allowed to proceed (spec.md §4.7).
pub fn check_usage_quota(current_usage: u64, limit: u64, resource: &str) -> Result<()> {
    if current_usage >= limit {
        return Err(IronlayerError::QuotaExceeded(format!(
            "{resource} usage {current_usage} has reached the limit of {limit}"
        )));
    }
    Ok(())
}

/// Checks spend-to-date against a budget cap. Unlike `check_usage_quota`
/// this maps to BUDGET_EXCEEDED, not QUOTA_EXCEEDED, matching the distinct
/// PAYMENT_REQUIRED transport mapping spec.md §4.7 calls for.
pub fn check_budget(spent_usd: f64, cap_usd: f64, period: &str) -> Result<()> {
    if spent_usd >= cap_usd {
        return Err(IronlayerError::BudgetExceeded {
            period: period.to_string(),
        });
    }
    Ok(())
}

/// A seat guard acquires this before inviting a new user, so two
/// concurrent invites can't both observe room under the seat limit. The
/// actual advisory lock is acquired by the state store (spec.md §5); this
/// function is the pure decision the lock protects.
pub fn check_seat_quota(current_seats: u32, seat_limit: u32) -> Result<()> {
    check_usage_quota(current_seats as u64, seat_limit as u64, "seats")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_at_limit_is_rejected() {
        let err = check_usage_quota(10, 10, "plans").unwrap_err();
        assert_eq!(err.kind(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn budget_cliff_exact_boundary() {
        assert!(check_budget(0.99, 1.00, "daily").is_ok());
        let err = check_budget(1.00, 1.00, "daily").unwrap_err();
        assert_eq!(err.kind(), "BUDGET_EXCEEDED");
    }
}
