use super::{RunRecord, StateStore, BillingSubscription, TokenRevocation, UsageEvent};
use crate::error::{IronlayerError, Result};
use crate::governance::AuditEntry;
use crate::models::{ModelDefinition, Snapshot};
use crate::planner::Plan;
use uuid::Uuid;

/// Holds the SQL text and the per-transaction tenant-scoping discipline
/// without opening a live connection — physical database execution is out
/// of scope for this crate (spec.md §1). Exists so the trait boundary and
/// the `SET ironlayer.tenant_id = $1` statement are visible and unit
/// testable without a warehouse collaborator (SPEC_FULL.md §13).
pub struct PostgresStore {
    pub database_url: String,
}

impl PostgresStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// The statement every tenant-scoped transaction must run first, so
    /// PostgreSQL row-level-security policies enforce isolation
    /// independently of any application-level `WHERE tenant_id = ...`
    /// predicate (spec.md §5).
    pub fn set_tenant_statement(tenant_id: Uuid) -> String {
        format!("SET ironlayer.tenant_id = '{tenant_id}'")
    }

    fn unimplemented(operation: &str) -> IronlayerError {
        IronlayerError::CollaboratorUnavailable(format!(
            "PostgresStore.{operation} requires a live database connection, which this crate does not open"
        ))
    }
}

impl StateStore for PostgresStore {
    fn put_model_definition(&self, _tenant_id: Uuid, _def: ModelDefinition) -> Result<()> {
        Err(Self::unimplemented("put_model_definition"))
    }

    fn get_model_definition(&self, _tenant_id: Uuid, _name: &str) -> Result<Option<ModelDefinition>> {
        Err(Self::unimplemented("get_model_definition"))
    }

    fn list_model_definitions(&self, _tenant_id: Uuid) -> Result<Vec<ModelDefinition>> {
        Err(Self::unimplemented("list_model_definitions"))
    }

    fn put_snapshot(&self, _tenant_id: Uuid, _label: &str, _snapshot: Snapshot) -> Result<()> {
        Err(Self::unimplemented("put_snapshot"))
    }

    fn get_snapshot(&self, _tenant_id: Uuid, _label: &str) -> Result<Option<Snapshot>> {
        Err(Self::unimplemented("get_snapshot"))
    }

    fn put_plan(&self, _tenant_id: Uuid, _plan: Plan) -> Result<()> {
        Err(Self::unimplemented("put_plan"))
    }

    fn get_plan(&self, _tenant_id: Uuid, _plan_id: &str) -> Result<Option<Plan>> {
        Err(Self::unimplemented("get_plan"))
    }

    fn list_plans(&self, _tenant_id: Uuid) -> Result<Vec<Plan>> {
        Err(Self::unimplemented("list_plans"))
    }

    fn put_run(&self, _tenant_id: Uuid, _run: RunRecord) -> Result<()> {
        Err(Self::unimplemented("put_run"))
    }

    fn get_run(&self, _tenant_id: Uuid, _run_id: &str) -> Result<Option<RunRecord>> {
        Err(Self::unimplemented("get_run"))
    }

    fn list_runs_for_plan(&self, _tenant_id: Uuid, _plan_id: &str) -> Result<Vec<RunRecord>> {
        Err(Self::unimplemented("list_runs_for_plan"))
    }

    fn append_audit_entry(&self, _entry: AuditEntry) -> Result<()> {
        Err(Self::unimplemented("append_audit_entry"))
    }

    fn list_audit_entries(&self, _tenant_id: Uuid) -> Result<Vec<AuditEntry>> {
        Err(Self::unimplemented("list_audit_entries"))
    }

    fn record_usage_event(&self, _tenant_id: Uuid, _event: UsageEvent) -> Result<()> {
        Err(Self::unimplemented("record_usage_event"))
    }

    fn usage_total_since(&self, _tenant_id: Uuid, _resource: &str, _since_epoch_secs: i64) -> Result<u64> {
        Err(Self::unimplemented("usage_total_since"))
    }

    fn put_subscription(&self, _subscription: BillingSubscription) -> Result<()> {
        Err(Self::unimplemented("put_subscription"))
    }

    fn get_subscription(&self, _tenant_id: Uuid) -> Result<Option<BillingSubscription>> {
        Err(Self::unimplemented("get_subscription"))
    }

    fn revoke_token(&self, _revocation: TokenRevocation) -> Result<()> {
        Err(Self::unimplemented("revoke_token"))
    }

    fn is_token_revoked(&self, _jti: &str) -> Result<bool> {
        Err(Self::unimplemented("is_token_revoked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_scoping_statement_embeds_the_tenant_id() {
        let tenant = Uuid::nil();
        let stmt = PostgresStore::set_tenant_statement(tenant);
        assert_eq!(stmt, "SET ironlayer.tenant_id = '00000000-0000-0000-0000-000000000000'");
    }

    #[test]
    fn unimplemented_operations_report_collaborator_unavailable() {
        let store = PostgresStore::new("postgres://localhost/ironlayer");
        let err = store.get_plan(Uuid::nil(), "p1").unwrap_err();
        assert_eq!(err.kind(), "COLLABORATOR_UNAVAILABLE");
    }
}
