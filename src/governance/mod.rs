//! Governance core: tenant isolation, authentication, RBAC, the plan
//! approval state machine, the audit hash chain, quota/rate-limit guards,
//! CSRF, and input validation (spec.md §4.7).
//!
//! Grounded in the teacher's `src/security` (rbac.rs, authentication.rs,
//! encryption.rs), `src/audit`, and `src/multitenancy/tenant.rs`.

mod approval;
mod audit;
mod auth;
mod csrf;
mod quota;
mod rate_limit;
mod rbac;
mod tenant;
mod validation;

pub use approval::{ApprovalState, DecisionRecord, PlanStatus};
pub use audit::{append as append_audit_entry, verify_chain, AuditEntry, GENESIS_HASH};
pub use auth::{
    api_key_prefix, constant_time_eq, verify_api_key, ApiKeyRecord, HmacVerifier, Identity,
    IdentityKind, OidcVerifier, RawToken, TokenVerifier,
};
pub use csrf::{generate_token as generate_csrf_token, requires_csrf_check, verify as verify_csrf, AuthCarrier};
pub use quota::{check_budget, check_seat_quota, check_usage_quota};
pub use rate_limit::{LoginBackoff, SlidingWindowLimiter};
pub use rbac::{permits, permits_admin_surface, resolved_capabilities, Capability, Role};
pub use tenant::TenantContext;
pub use validation::{
    defuse_csv_cell, escape_like_term, validate_contained_path, validate_git_ref, validate_webhook_url,
};
