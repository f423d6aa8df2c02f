//! The deterministic planner: given a base and target snapshot plus the DAG
//! over the target, produces a reproducible execution `Plan`.

mod classify;
pub mod cost;

pub use classify::ChangeKind;

use crate::checks::{ContractChecker, ContractViolationRecord};
use crate::config::{ClusterSize, Config};
use crate::dag::Dag;
use crate::models::{ModelDefinition, ModelKind, Snapshot};
use crate::sql::SqlDialect;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunType {
    FullRefresh,
    Incremental,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_id: String,
    pub model: String,
    pub run_type: RunType,
    pub input_range: Option<(NaiveDate, NaiveDate)>,
    pub depends_on: Vec<String>,
    pub parallel_group: u32,
    pub reason: String,
    pub estimated_seconds: f64,
    pub estimated_usd: f64,
    pub contract_violations: Vec<ContractViolationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanSummary {
    pub total_steps: usize,
    pub estimated_cost_usd: f64,
    pub models_changed: Vec<String>,
    pub cosmetic_changes_skipped: Vec<String>,
    pub breaking_contract_violations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub base: Snapshot,
    pub target: Snapshot,
    pub steps: Vec<PlanStep>,
    pub summary: PlanSummary,
}

/// Per-model size hints the planner cannot derive itself (no warehouse
/// collaborator access); supplied by the caller, defaults applied when
/// absent.
#[derive(Debug, Clone, Copy)]
pub struct CostFeatures {
    pub partitions: u32,
    pub data_volume_gb: f64,
}

impl Default for CostFeatures {
    fn default() -> Self {
        Self {
            partitions: 1,
            data_volume_gb: 1.0,
        }
    }
}

/// Everything `generate` needs, collected in one place so the function
/// signature stays stable as new ambient inputs are added.
pub struct PlannerInput<'a> {
    pub base: &'a Snapshot,
    pub target: &'a Snapshot,
    pub target_models: &'a BTreeMap<String, ModelDefinition>,
    pub base_clean_sql: &'a BTreeMap<String, String>,
    pub dag: &'a Dag,
    pub as_of: NaiveDate,
    pub base_max_dates: &'a BTreeMap<String, NaiveDate>,
    pub cost_features: &'a BTreeMap<String, CostFeatures>,
    pub dialect: SqlDialect,
}

/// Produce a deterministic `Plan` for (base, target). Given identical
/// inputs — including `as_of`, which is supplied rather than read from the
/// wall clock — `plan_id` and the ordered `step_id`s are bit-identical
/// (spec.md §4.4 determinism invariant).
pub fn generate(input: &PlannerInput, config: &Config, checker: &dyn ContractChecker) -> Plan {
    // Step 1: structural diff, sorted by construction (BTreeMap/BTreeSet).
    let added: BTreeSet<String> = input
        .target
        .keys()
        .filter(|k| !input.base.contains_key(*k))
        .cloned()
        .collect();
    let modified_or_same: BTreeSet<String> = input
        .target
        .keys()
        .filter(|k| input.base.contains_key(*k))
        .cloned()
        .collect();
    let modified: BTreeSet<String> = modified_or_same
        .iter()
        .filter(|k| input.base.get(*k) != input.target.get(*k))
        .cloned()
        .collect();

    let mut cosmetic_changes_skipped = Vec::new();
    let mut classifications: BTreeMap<String, ChangeKind> = BTreeMap::new();

    // Step 2 + 3: cosmetic elision, then classification.
    for name in &modified {
        let Some(target_model) = input.target_models.get(name) else {
            continue;
        };
        let Some(base_sql) = input.base_clean_sql.get(name) else {
            // No prior clean_sql on record: treat conservatively as breaking.
            classifications.insert(name.clone(), ChangeKind::Breaking);
            continue;
        };
        let kind = classify::classify_change(base_sql, &target_model.clean_sql, input.dialect);
        if kind == ChangeKind::Cosmetic {
            cosmetic_changes_skipped.push(name.clone());
        } else {
            classifications.insert(name.clone(), kind);
        }
    }
    cosmetic_changes_skipped.sort();

    for name in &added {
        classifications.insert(name.clone(), ChangeKind::Breaking);
    }

    // Step 4: forward closure through the DAG. Propagation stops at model
    // boundaries; intermediate models inherit the most-severe upstream
    // classification.
    let propagation_roots: Vec<(String, ChangeKind)> = classifications
        .iter()
        .filter(|(_, k)| k.triggers_downstream_rebuild())
        .map(|(n, k)| (n.clone(), *k))
        .collect();

    for (root, root_kind) in &propagation_roots {
        for downstream in input.dag.downstream_closure(root) {
            let entry = classifications
                .entry(downstream)
                .or_insert(ChangeKind::NonBreaking);
            *entry = entry.most_severe(*root_kind);
        }
    }

    let selected: BTreeSet<String> = classifications.keys().cloned().collect();

    // Step 6: parallel-group depth within the induced subgraph of selected
    // models.
    let depths = input.dag.depths_within(&selected);

    // Steps 5, 7, 8, 9.
    let mut steps = Vec::with_capacity(selected.len());
    let mut breaking_contract_violations = 0usize;
    let mut total_usd = 0.0;

    for name in &selected {
        let Some(model) = input.target_models.get(name) else {
            continue;
        };
        let kind = classifications[name];

        let (run_type, input_range) = select_run_type(model, kind, input.as_of, input.base_max_dates.get(name));

        let violations = checker.check_contracts(model);
        breaking_contract_violations += violations
            .iter()
            .filter(|v| v.is_breaking())
            .count();

        let features = input.cost_features.get(name).copied().unwrap_or_default();
        let cluster = config.cluster_template(config.default_cluster_size);
        let seconds = cost::heuristic_runtime_seconds(
            features.partitions,
            features.data_volume_gb,
            cluster.workers,
        );
        let usd = cost::estimate_usd(seconds, cluster.cost_per_second_usd);
        total_usd += usd;

        let range_bytes = input_range
            .map(|(s, e)| format!("{s}:{e}"))
            .unwrap_or_default();
        let step_id = hash_parts(&[
            name.as_str(),
            run_type_tag(run_type),
            range_bytes.as_str(),
            model.content_hash.as_str(),
        ]);

        steps.push(PlanStep {
            step_id,
            model: name.clone(),
            run_type,
            input_range,
            depends_on: Vec::new(), // filled in below once all step_ids exist
            parallel_group: depths.get(name).copied().unwrap_or(0),
            reason: reason_for(kind),
            estimated_seconds: seconds,
            estimated_usd: usd,
            contract_violations: violations,
        });
    }

    // (parallel_group asc, model asc) ordering guarantee (spec.md §5a).
    steps.sort_by(|a, b| a.parallel_group.cmp(&b.parallel_group).then(a.model.cmp(&b.model)));

    let step_id_by_model: BTreeMap<String, String> = steps
        .iter()
        .map(|s| (s.model.clone(), s.step_id.clone()))
        .collect();
    for step in steps.iter_mut() {
        let mut deps: Vec<String> = input
            .dag
            .upstream_of(&step.model)
            .into_iter()
            .filter_map(|u| step_id_by_model.get(&u).cloned())
            .collect();
        deps.sort();
        step.depends_on = deps;
    }

    let ordered_step_ids: Vec<String> = steps.iter().map(|s| s.step_id.clone()).collect();
    let plan_id = hash_plan_id(input.base, input.target, &ordered_step_ids);

    let mut models_changed: Vec<String> = selected.into_iter().collect();
    models_changed.sort();

    Plan {
        plan_id,
        base: input.base.clone(),
        target: input.target.clone(),
        summary: PlanSummary {
            total_steps: steps.len(),
            estimated_cost_usd: total_usd,
            models_changed,
            cosmetic_changes_skipped,
            breaking_contract_violations,
        },
        steps,
    }
}

fn select_run_type(
    model: &ModelDefinition,
    kind: ChangeKind,
    as_of: NaiveDate,
    base_max_date: Option<&NaiveDate>,
) -> (RunType, Option<(NaiveDate, NaiveDate)>) {
    if model.kind == ModelKind::FullRefresh || kind.requires_full_refresh() {
        return (RunType::FullRefresh, None);
    }
    if model.kind == ModelKind::IncrementalByTimeRange {
        let start = base_max_date
            .map(|d| *d + chrono::Duration::days(1))
            .unwrap_or(as_of);
        return (RunType::Incremental, Some((start, as_of)));
    }
    (RunType::FullRefresh, None)
}

fn reason_for(kind: ChangeKind) -> String {
    match kind {
        ChangeKind::Cosmetic => "cosmetic change (should not appear as a step)".to_string(),
        ChangeKind::RenameOnly => "output column renamed".to_string(),
        ChangeKind::NonBreaking => "non-breaking change".to_string(),
        ChangeKind::PartitionShift => "partition shape changed".to_string(),
        ChangeKind::MetricSemantic => "metric semantics changed".to_string(),
        ChangeKind::Breaking => "breaking change".to_string(),
    }
}

fn run_type_tag(run_type: RunType) -> &'static str {
    match run_type {
        RunType::FullRefresh => "FULL_REFRESH",
        RunType::Incremental => "INCREMENTAL",
    }
}

fn hash_parts(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

fn hash_plan_id(base: &Snapshot, target: &Snapshot, ordered_step_ids: &[String]) -> String {
    let mut hasher = Sha256::new();
    for (k, v) in base {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"|");
    for (k, v) in target {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"|");
    for id in ordered_step_ids {
        hasher.update(id.as_bytes());
        hasher.update(b",");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::NoopContractChecker;
    use crate::models::{ColumnContract, DeclaredTest, Materialization};

    fn model(name: &str, kind: ModelKind, clean_sql: &str, hash: &str) -> ModelDefinition {
        ModelDefinition {
            canonical_name: name.to_string(),
            kind,
            materialization: Materialization::Table,
            raw_sql: clean_sql.to_string(),
            clean_sql: clean_sql.to_string(),
            content_hash: hash.to_string(),
            referenced_tables: Vec::new(),
            output_columns: Vec::new(),
            column_contracts: Vec::<ColumnContract>::new(),
            tests: Vec::<DeclaredTest>::new(),
            time_column: None,
            unique_key: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn empty_diff_yields_zero_steps_but_deterministic_plan_id() {
        let base: Snapshot = [("a.b".to_string(), "h1".to_string())].into_iter().collect();
        let target = base.clone();
        let target_models: BTreeMap<String, ModelDefinition> = BTreeMap::new();
        let base_clean_sql = BTreeMap::new();
        let nodes: BTreeSet<String> = BTreeSet::new();
        let dag = Dag::build(&nodes, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        let cost_features = BTreeMap::new();
        let base_max_dates = BTreeMap::new();
        let config = Config::default();
        let checker = NoopContractChecker;

        let input = PlannerInput {
            base: &base,
            target: &target,
            target_models: &target_models,
            base_clean_sql: &base_clean_sql,
            dag: &dag,
            as_of: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            base_max_dates: &base_max_dates,
            cost_features: &cost_features,
            dialect: SqlDialect::Redshift,
        };

        let plan1 = generate(&input, &config, &checker);
        let plan2 = generate(&input, &config, &checker);
        assert_eq!(plan1.summary.total_steps, 0);
        assert_eq!(plan1.plan_id, plan2.plan_id);
    }

    #[test]
    fn cosmetic_only_change_produces_no_steps() {
        let base: Snapshot = [("a.orders".to_string(), "h1".to_string())].into_iter().collect();
        let target: Snapshot = [("a.orders".to_string(), "h2".to_string())].into_iter().collect();
        let mut target_models = BTreeMap::new();
        target_models.insert(
            "a.orders".to_string(),
            model("a.orders", ModelKind::FullRefresh, "select   a\nfrom t", "h2"),
        );
        let mut base_clean_sql = BTreeMap::new();
        base_clean_sql.insert("a.orders".to_string(), "SELECT a FROM t".to_string());

        let nodes: BTreeSet<String> = ["a.orders".to_string()].into_iter().collect();
        let dag = Dag::build(&nodes, &BTreeMap::new(), &BTreeMap::new()).unwrap();
        let cost_features = BTreeMap::new();
        let base_max_dates = BTreeMap::new();
        let config = Config::default();
        let checker = NoopContractChecker;

        let input = PlannerInput {
            base: &base,
            target: &target,
            target_models: &target_models,
            base_clean_sql: &base_clean_sql,
            dag: &dag,
            as_of: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            base_max_dates: &base_max_dates,
            cost_features: &cost_features,
            dialect: SqlDialect::Redshift,
        };

        let plan = generate(&input, &config, &checker);
        assert_eq!(plan.summary.total_steps, 0);
        assert_eq!(plan.summary.cosmetic_changes_skipped, vec!["a.orders".to_string()]);
    }

    #[test]
    fn breaking_change_propagates_downstream() {
        let base: Snapshot = [
            ("staging.raw_orders".to_string(), "rh1".to_string()),
            ("analytics.orders_daily".to_string(), "oh1".to_string()),
            ("reporting.orders_weekly".to_string(), "wh1".to_string()),
        ]
        .into_iter()
        .collect();
        let target: Snapshot = [
            ("staging.raw_orders".to_string(), "rh1".to_string()),
            ("analytics.orders_daily".to_string(), "oh2".to_string()),
            ("reporting.orders_weekly".to_string(), "wh1".to_string()),
        ]
        .into_iter()
        .collect();

        let mut target_models = BTreeMap::new();
        target_models.insert(
            "staging.raw_orders".to_string(),
            model("staging.raw_orders", ModelKind::FullRefresh, "SELECT * FROM raw", "rh1"),
        );
        target_models.insert(
            "analytics.orders_daily".to_string(),
            model(
                "analytics.orders_daily",
                ModelKind::FullRefresh,
                "SELECT AVG(amount) AS total FROM staging.raw_orders",
                "oh2",
            ),
        );
        target_models.insert(
            "reporting.orders_weekly".to_string(),
            model(
                "reporting.orders_weekly",
                ModelKind::FullRefresh,
                "SELECT total FROM analytics.orders_daily",
                "wh1",
            ),
        );

        let mut base_clean_sql = BTreeMap::new();
        base_clean_sql.insert(
            "analytics.orders_daily".to_string(),
            "SELECT SUM(amount) AS total FROM staging.raw_orders".to_string(),
        );

        let nodes: BTreeSet<String> = target_models.keys().cloned().collect();
        let mut refs = BTreeMap::new();
        refs.insert(
            "analytics.orders_daily".to_string(),
            vec!["staging.raw_orders".to_string()],
        );
        refs.insert(
            "reporting.orders_weekly".to_string(),
            vec!["analytics.orders_daily".to_string()],
        );
        let dag = Dag::build(&nodes, &refs, &BTreeMap::new()).unwrap();

        let cost_features = BTreeMap::new();
        let base_max_dates = BTreeMap::new();
        let config = Config::default();
        let checker = NoopContractChecker;

        let input = PlannerInput {
            base: &base,
            target: &target,
            target_models: &target_models,
            base_clean_sql: &base_clean_sql,
            dag: &dag,
            as_of: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            base_max_dates: &base_max_dates,
            cost_features: &cost_features,
            dialect: SqlDialect::Redshift,
        };

        let plan = generate(&input, &config, &checker);
        assert_eq!(plan.summary.total_steps, 2);
        assert_eq!(plan.steps[0].model, "analytics.orders_daily");
        assert_eq!(plan.steps[0].parallel_group, 0);
        assert_eq!(plan.steps[1].model, "reporting.orders_weekly");
        assert_eq!(plan.steps[1].parallel_group, 1);
        assert_eq!(plan.steps[1].depends_on, vec![plan.steps[0].step_id.clone()]);
    }
}
