use ironlayer_core::governance::{
    append_audit_entry, check_budget, verify_chain, ApprovalState, SlidingWindowLimiter, GENESIS_HASH,
};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Scenario 3 (spec.md §8): approving twice with the same identity is a
/// conflict, and the audit log gets exactly one PLAN_APPROVED entry whose
/// hash chains off the previous entry.
#[test]
fn approval_determinism_rejects_duplicate_and_chains_audit_entry() {
    let mut state = ApprovalState::new();
    state.approve("alice", None, false).unwrap();
    let err = state.approve("alice", None, false).unwrap_err();
    assert_eq!(err.kind(), "CONFLICT");
    assert_eq!(state.approvals.len(), 1);

    let tenant = Uuid::nil();
    let entry = append_audit_entry(tenant, "alice", "PLAN_APPROVED", "plan-1", GENESIS_HASH);
    assert_eq!(entry.previous_hash, GENESIS_HASH);
    assert!(verify_chain(&[entry]).is_ok());
}

/// Scenario 4 (spec.md §8): the budget guard admits calls while
/// `spent_usd < cap_usd` and refuses exactly at the cliff.
#[test]
fn budget_cliff_admits_until_spend_reaches_the_cap() {
    let daily_cap_usd = 1.00;
    let mut spent = 0.99;

    assert!(check_budget(spent, daily_cap_usd, "daily").is_ok());

    // A call priced at 500 input / 200 output tokens against $3/$15 per
    // million would cost 500*3e-6 + 200*15e-6 = 4.5e-3 USD.
    let call_cost = 500.0 * 3.0e-6 + 200.0 * 15.0e-6;
    spent += call_cost;
    assert!(spent < daily_cap_usd);
    assert!(check_budget(spent, daily_cap_usd, "daily").is_ok());

    let err = check_budget(daily_cap_usd, daily_cap_usd, "daily").unwrap_err();
    assert_eq!(err.kind(), "BUDGET_EXCEEDED");
}

/// Scenario 5 (spec.md §8): a 60s/60-request window denies the 61st
/// request at t=30 with `retry_after = 30`, and admits the 62nd at t=60.
#[test]
fn rate_limit_denies_then_admits_at_window_boundary() {
    let limiter = SlidingWindowLimiter::new(60, 60);
    let t0 = Instant::now();
    for _ in 0..60 {
        limiter.check("tenant-a", t0).unwrap();
    }

    let t30 = t0 + Duration::from_secs(30);
    let err = limiter.check("tenant-a", t30).unwrap_err();
    assert_eq!(err.kind(), "RATE_LIMITED");

    let t60 = t0 + Duration::from_secs(60);
    assert!(limiter.check("tenant-a", t60).is_ok());
}

/// Scenario 6 (spec.md §8): tampering with an entry's fields without
/// recomputing hashes is detected at the first mismatched index.
#[test]
fn audit_tamper_detection_reports_first_mismatch_index() {
    let tenant = Uuid::nil();
    let entry_a = append_audit_entry(tenant, "alice", "PLAN_APPROVED", "plan-1", GENESIS_HASH);
    let mut entry_b = append_audit_entry(tenant, "bob", "PLAN_APPLIED", "plan-1", &entry_a.entry_hash);
    let entry_c = append_audit_entry(tenant, "carol", "PLAN_CANCELLED", "plan-1", &entry_b.entry_hash);

    assert!(verify_chain(&[entry_a.clone(), entry_b.clone(), entry_c.clone()]).is_ok());

    entry_b.resource = "plan-1-tampered".to_string();
    let result = verify_chain(&[entry_a, entry_b, entry_c]);
    assert_eq!(result, Err(1));
}
