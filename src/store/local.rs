use super::{RunRecord, StateStore, BillingSubscription, TokenRevocation, UsageEvent};
use crate::error::Result;
use crate::governance::AuditEntry;
use crate::models::{ModelDefinition, Snapshot};
use crate::planner::Plan;
use dashmap::DashMap;
use uuid::Uuid;

/// In-process implementation, used for `state_store = local` (the
/// SQLite-equivalent single-tenant mode) and throughout the test suite.
/// Each repository is a `DashMap` keyed by `(tenant_id, name)` so reads and
/// writes for different tenants never contend (spec.md §5 shared-resource
/// policy): the teacher's `src/storage` module keyed its in-memory tables
/// the same way.
#[derive(Default)]
pub struct LocalStore {
    model_definitions: DashMap<(Uuid, String), ModelDefinition>,
    snapshots: DashMap<(Uuid, String), Snapshot>,
    plans: DashMap<(Uuid, String), Plan>,
    runs: DashMap<(Uuid, String), RunRecord>,
    audit_entries: DashMap<Uuid, Vec<AuditEntry>>,
    usage_events: DashMap<(Uuid, String), Vec<UsageEvent>>,
    subscriptions: DashMap<Uuid, BillingSubscription>,
    revoked_tokens: DashMap<String, TokenRevocation>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for LocalStore {
    fn put_model_definition(&self, tenant_id: Uuid, def: ModelDefinition) -> Result<()> {
        self.model_definitions.insert((tenant_id, def.canonical_name.clone()), def);
        Ok(())
    }

    fn get_model_definition(&self, tenant_id: Uuid, name: &str) -> Result<Option<ModelDefinition>> {
        Ok(self.model_definitions.get(&(tenant_id, name.to_string())).map(|r| r.value().clone()))
    }

    fn list_model_definitions(&self, tenant_id: Uuid) -> Result<Vec<ModelDefinition>> {
        let mut out: Vec<ModelDefinition> = self
            .model_definitions
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        Ok(out)
    }

    fn put_snapshot(&self, tenant_id: Uuid, label: &str, snapshot: Snapshot) -> Result<()> {
        self.snapshots.insert((tenant_id, label.to_string()), snapshot);
        Ok(())
    }

    fn get_snapshot(&self, tenant_id: Uuid, label: &str) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.get(&(tenant_id, label.to_string())).map(|r| r.value().clone()))
    }

    fn put_plan(&self, tenant_id: Uuid, plan: Plan) -> Result<()> {
        self.plans.insert((tenant_id, plan.plan_id.clone()), plan);
        Ok(())
    }

    fn get_plan(&self, tenant_id: Uuid, plan_id: &str) -> Result<Option<Plan>> {
        Ok(self.plans.get(&(tenant_id, plan_id.to_string())).map(|r| r.value().clone()))
    }

    fn list_plans(&self, tenant_id: Uuid) -> Result<Vec<Plan>> {
        let mut out: Vec<Plan> = self
            .plans
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.plan_id.cmp(&b.plan_id));
        Ok(out)
    }

    fn put_run(&self, tenant_id: Uuid, run: RunRecord) -> Result<()> {
        self.runs.insert((tenant_id, run.run_id.clone()), run);
        Ok(())
    }

    fn get_run(&self, tenant_id: Uuid, run_id: &str) -> Result<Option<RunRecord>> {
        Ok(self.runs.get(&(tenant_id, run_id.to_string())).map(|r| r.value().clone()))
    }

    fn list_runs_for_plan(&self, tenant_id: Uuid, plan_id: &str) -> Result<Vec<RunRecord>> {
        let mut out: Vec<RunRecord> = self
            .runs
            .iter()
            .filter(|entry| entry.key().0 == tenant_id && entry.value().plan_id == plan_id)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by(|a, b| a.step_id.cmp(&b.step_id));
        Ok(out)
    }

    fn append_audit_entry(&self, entry: AuditEntry) -> Result<()> {
        self.audit_entries.entry(entry.tenant_id).or_default().push(entry);
        Ok(())
    }

    fn list_audit_entries(&self, tenant_id: Uuid) -> Result<Vec<AuditEntry>> {
        Ok(self.audit_entries.get(&tenant_id).map(|r| r.value().clone()).unwrap_or_default())
    }

    fn record_usage_event(&self, tenant_id: Uuid, event: UsageEvent) -> Result<()> {
        self.usage_events
            .entry((tenant_id, event.resource.clone()))
            .or_default()
            .push(event);
        Ok(())
    }

    fn usage_total_since(&self, tenant_id: Uuid, resource: &str, since_epoch_secs: i64) -> Result<u64> {
        let total = self
            .usage_events
            .get(&(tenant_id, resource.to_string()))
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.period_start_epoch_secs >= since_epoch_secs)
                    .map(|e| e.quantity)
                    .sum()
            })
            .unwrap_or(0);
        Ok(total)
    }

    fn put_subscription(&self, subscription: BillingSubscription) -> Result<()> {
        self.subscriptions.insert(subscription.tenant_id, subscription);
        Ok(())
    }

    fn get_subscription(&self, tenant_id: Uuid) -> Result<Option<BillingSubscription>> {
        Ok(self.subscriptions.get(&tenant_id).map(|r| r.value().clone()))
    }

    fn revoke_token(&self, revocation: TokenRevocation) -> Result<()> {
        self.revoked_tokens.insert(revocation.jti.clone(), revocation);
        Ok(())
    }

    fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        Ok(self.revoked_tokens.contains_key(jti))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnContract, DeclaredTest, Materialization, ModelKind};

    fn sample_model() -> ModelDefinition {
        ModelDefinition {
            canonical_name: "analytics.orders_daily".to_string(),
            kind: ModelKind::FullRefresh,
            materialization: Materialization::Table,
            raw_sql: String::new(),
            clean_sql: "SELECT 1".to_string(),
            content_hash: "h1".to_string(),
            referenced_tables: Vec::new(),
            output_columns: Vec::<String>::new(),
            column_contracts: Vec::<ColumnContract>::new(),
            tests: Vec::<DeclaredTest>::new(),
            time_column: None,
            unique_key: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn model_definitions_are_tenant_isolated() {
        let store = LocalStore::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        store.put_model_definition(tenant_a, sample_model()).unwrap();
        assert!(store.get_model_definition(tenant_a, "analytics.orders_daily").unwrap().is_some());
        assert!(store.get_model_definition(tenant_b, "analytics.orders_daily").unwrap().is_none());
    }

    #[test]
    fn usage_total_sums_events_since_period_start() {
        let store = LocalStore::new();
        let tenant = Uuid::new_v4();
        store
            .record_usage_event(
                tenant,
                UsageEvent {
                    resource: "llm_calls".to_string(),
                    quantity: 3,
                    period_start_epoch_secs: 100,
                },
            )
            .unwrap();
        store
            .record_usage_event(
                tenant,
                UsageEvent {
                    resource: "llm_calls".to_string(),
                    quantity: 5,
                    period_start_epoch_secs: 50,
                },
            )
            .unwrap();
        assert_eq!(store.usage_total_since(tenant, "llm_calls", 75).unwrap(), 3);
        assert_eq!(store.usage_total_since(tenant, "llm_calls", 0).unwrap(), 8);
    }
}
