//! State Store: typed repositories over model definitions, snapshots,
//! plans, runs, audit entries, and the governance/billing entities, behind
//! one `StateStore` trait (SPEC_FULL.md §13).
//!
//! Grounded in the teacher's `src/storage` for the repository-trait shape
//! and `src/multitenancy/tenant.rs` for per-tenant resource tracking.

mod local;
mod postgres;

pub use local::LocalStore;
pub use postgres::PostgresStore;

use crate::error::Result;
use crate::governance::AuditEntry;
use crate::models::{ModelDefinition, Snapshot};
use crate::planner::Plan;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub plan_id: String,
    pub step_id: String,
    pub status: RunStatus,
    pub runtime_seconds: Option<f64>,
    pub rows_processed: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub resource: String,
    pub quantity: u64,
    pub period_start_epoch_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSubscription {
    pub tenant_id: Uuid,
    pub plan_name: String,
    pub seat_limit: u32,
    pub daily_budget_usd: f64,
    pub monthly_budget_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRevocation {
    pub jti: String,
    pub revoked_at_epoch_secs: i64,
}

/// Every repository a tenant-scoped operation needs, behind one trait so
/// `LocalStore` (in-process) and `PostgresStore` (stubbed transport) are
/// interchangeable. Every method is tenant-scoped except the audit chain,
/// which additionally exposes a global ordering for chain verification.
pub trait StateStore: Send + Sync {
    fn put_model_definition(&self, tenant_id: Uuid, def: ModelDefinition) -> Result<()>;
    fn get_model_definition(&self, tenant_id: Uuid, name: &str) -> Result<Option<ModelDefinition>>;
    fn list_model_definitions(&self, tenant_id: Uuid) -> Result<Vec<ModelDefinition>>;

    fn put_snapshot(&self, tenant_id: Uuid, label: &str, snapshot: Snapshot) -> Result<()>;
    fn get_snapshot(&self, tenant_id: Uuid, label: &str) -> Result<Option<Snapshot>>;

    fn put_plan(&self, tenant_id: Uuid, plan: Plan) -> Result<()>;
    fn get_plan(&self, tenant_id: Uuid, plan_id: &str) -> Result<Option<Plan>>;
    fn list_plans(&self, tenant_id: Uuid) -> Result<Vec<Plan>>;

    fn put_run(&self, tenant_id: Uuid, run: RunRecord) -> Result<()>;
    fn get_run(&self, tenant_id: Uuid, run_id: &str) -> Result<Option<RunRecord>>;
    fn list_runs_for_plan(&self, tenant_id: Uuid, plan_id: &str) -> Result<Vec<RunRecord>>;

    fn append_audit_entry(&self, entry: AuditEntry) -> Result<()>;
    fn list_audit_entries(&self, tenant_id: Uuid) -> Result<Vec<AuditEntry>>;

    fn record_usage_event(&self, tenant_id: Uuid, event: UsageEvent) -> Result<()>;
    fn usage_total_since(&self, tenant_id: Uuid, resource: &str, since_epoch_secs: i64) -> Result<u64>;

    fn put_subscription(&self, subscription: BillingSubscription) -> Result<()>;
    fn get_subscription(&self, tenant_id: Uuid) -> Result<Option<BillingSubscription>>;

    fn revoke_token(&self, revocation: TokenRevocation) -> Result<()>;
    fn is_token_revoked(&self, jti: &str) -> Result<bool>;
}
