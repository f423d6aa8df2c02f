//! Check Engine: a registry of named check types run against a model set.
//! Results are sorted deterministically and rolled into a summary the
//! planner and governance layers both consult (spec.md §4.5).

use crate::models::ModelDefinition;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    ModelTest,
    SchemaContract,
    SchemaDrift,
    Reconciliation,
    DataFreshness,
    CrossModel,
    VolumeAnomaly,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Error,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_type: CheckType,
    pub model: String,
    pub status: CheckStatus,
    pub severity: Severity,
    pub message: String,
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl CheckResult {
    fn is_blocking(&self) -> bool {
        self.status == CheckStatus::Fail
            && matches!(self.severity, Severity::Critical | Severity::High)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warned: usize,
    pub errored: usize,
    pub skipped: usize,
    pub blocking_failures: usize,
    pub results: Vec<CheckResult>,
}

/// One contracted-column violation, surfaced both through the planner's
/// per-step `contract_violations` and through a standalone SCHEMA_CONTRACT
/// check run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractViolationRecord {
    pub column: String,
    pub message: String,
    pub severity: Severity,
}

impl ContractViolationRecord {
    pub fn is_breaking(&self) -> bool {
        matches!(self.severity, Severity::Critical | Severity::High)
    }
}

/// Validates a model's declared column contracts. The planner consults this
/// directly (spec.md §4.4 step 7); `run_checks` also wraps it as the
/// SCHEMA_CONTRACT check type.
pub trait ContractChecker: Send + Sync {
    fn check_contracts(&self, model: &ModelDefinition) -> Vec<ContractViolationRecord>;
}

/// A contract checker that finds nothing; used in tests and wherever
/// contract validation is deliberately out of scope.
pub struct NoopContractChecker;

impl ContractChecker for NoopContractChecker {
    fn check_contracts(&self, _model: &ModelDefinition) -> Vec<ContractViolationRecord> {
        Vec::new()
    }
}

/// Compares each declared `column_contracts` entry against the model's
/// actual output columns. A contracted column missing from the output is a
/// dropped-column violation; in `warn_mode` those are downgraded from
/// CRITICAL to MEDIUM so they no longer block (spec.md §4.5).
pub struct SchemaContractChecker {
    pub warn_mode: bool,
}

impl ContractChecker for SchemaContractChecker {
    fn check_contracts(&self, model: &ModelDefinition) -> Vec<ContractViolationRecord> {
        let mut violations = Vec::new();
        let produced: BTreeSet<&str> = model.output_columns.iter().map(|c| c.as_str()).collect();
        for contract in &model.column_contracts {
            if !produced.contains(contract.column.as_str()) {
                let severity = if self.warn_mode {
                    Severity::Medium
                } else {
                    Severity::Critical
                };
                violations.push(ContractViolationRecord {
                    column: contract.column.clone(),
                    message: format!(
                        "contracted column '{}' is no longer produced by '{}'",
                        contract.column, model.canonical_name
                    ),
                    severity,
                });
            }
        }
        violations
    }
}

/// Per-model freshness observation, supplied by the caller (the check
/// engine has no warehouse access of its own).
#[derive(Debug, Clone, Copy)]
pub struct FreshnessObservation {
    pub hours_since_last_load: f64,
    pub sla_hours: f64,
}

/// Per-model row-count observation for volume-anomaly detection, supplied
/// by the caller.
#[derive(Debug, Clone, Copy)]
pub struct VolumeObservation {
    pub row_count: i64,
    pub baseline_row_count: i64,
}

#[derive(Default)]
pub struct CheckContext<'a> {
    pub models: BTreeMap<String, &'a ModelDefinition>,
    pub model_filter: Option<BTreeSet<String>>,
    pub type_filter: Option<BTreeSet<CheckType>>,
    pub warn_mode: bool,
    pub freshness: BTreeMap<String, FreshnessObservation>,
    pub volume: BTreeMap<String, VolumeObservation>,
}

impl<'a> CheckContext<'a> {
    fn wants(&self, name: &str, check_type: CheckType) -> bool {
        if let Some(filter) = &self.model_filter {
            if !filter.contains(name) {
                return false;
            }
        }
        if let Some(filter) = &self.type_filter {
            if !filter.contains(&check_type) {
                return false;
            }
        }
        true
    }
}

/// Run every applicable check type over the context's model set. Results
/// are sorted deterministically by (model, check_type, status) per
/// spec.md §4.5; `duration_ms` is always 0 here since these are pure,
/// in-process computations with no I/O to time.
pub fn run_checks(ctx: &CheckContext) -> CheckSummary {
    let mut results = Vec::new();
    let contract_checker = SchemaContractChecker {
        warn_mode: ctx.warn_mode,
    };

    for (name, model) in &ctx.models {
        if ctx.wants(name, CheckType::ModelTest) {
            results.extend(run_model_tests(name, model));
        }
        if ctx.wants(name, CheckType::SchemaContract) {
            results.push(run_schema_contract(name, model, &contract_checker));
        }
        if ctx.wants(name, CheckType::DataFreshness) {
            if let Some(obs) = ctx.freshness.get(name) {
                results.push(run_freshness(name, *obs));
            }
        }
        if ctx.wants(name, CheckType::VolumeAnomaly) {
            if let Some(obs) = ctx.volume.get(name) {
                results.push(run_volume_anomaly(name, *obs));
            }
        }
    }

    results.sort_by(|a, b| {
        a.model
            .cmp(&b.model)
            .then(a.check_type.cmp(&b.check_type))
            .then(a.status.cmp(&b.status))
    });

    let mut summary = CheckSummary::default();
    summary.total = results.len();
    for r in &results {
        match r.status {
            CheckStatus::Pass => summary.passed += 1,
            CheckStatus::Fail => summary.failed += 1,
            CheckStatus::Warn => summary.warned += 1,
            CheckStatus::Error => summary.errored += 1,
            CheckStatus::Skip => summary.skipped += 1,
        }
        if r.is_blocking() {
            summary.blocking_failures += 1;
        }
    }
    summary.results = results;
    summary
}

fn run_model_tests(name: &str, model: &ModelDefinition) -> Vec<CheckResult> {
    if model.tests.is_empty() {
        return vec![CheckResult {
            check_type: CheckType::ModelTest,
            model: name.to_string(),
            status: CheckStatus::Skip,
            severity: Severity::Low,
            message: "no declared tests".to_string(),
            detail: None,
            duration_ms: 0,
        }];
    }
    model
        .tests
        .iter()
        .map(|t| {
            let in_scope = t
                .column
                .as_ref()
                .map(|c| model.output_columns.iter().any(|o| o == c))
                .unwrap_or(true);
            if in_scope {
                CheckResult {
                    check_type: CheckType::ModelTest,
                    model: name.to_string(),
                    status: CheckStatus::Pass,
                    severity: Severity::Low,
                    message: format!("'{}' declared and referenceable", t.name),
                    detail: t.column.clone(),
                    duration_ms: 0,
                }
            } else {
                CheckResult {
                    check_type: CheckType::ModelTest,
                    model: name.to_string(),
                    status: CheckStatus::Fail,
                    severity: Severity::High,
                    message: format!("test '{}' targets a column not produced by the model", t.name),
                    detail: t.column.clone(),
                    duration_ms: 0,
                }
            }
        })
        .collect()
}

fn run_schema_contract(
    name: &str,
    model: &ModelDefinition,
    checker: &dyn ContractChecker,
) -> CheckResult {
    let violations = checker.check_contracts(model);
    if violations.is_empty() {
        return CheckResult {
            check_type: CheckType::SchemaContract,
            model: name.to_string(),
            status: CheckStatus::Pass,
            severity: Severity::Low,
            message: "all contracted columns present".to_string(),
            detail: None,
            duration_ms: 0,
        };
    }
    let worst = violations
        .iter()
        .map(|v| v.severity)
        .max()
        .unwrap_or(Severity::Low);
    let status = if worst >= Severity::High {
        CheckStatus::Fail
    } else {
        CheckStatus::Warn
    };
    CheckResult {
        check_type: CheckType::SchemaContract,
        model: name.to_string(),
        status,
        severity: worst,
        message: format!("{} contracted column(s) violated", violations.len()),
        detail: Some(
            violations
                .iter()
                .map(|v| v.message.clone())
                .collect::<Vec<_>>()
                .join("; "),
        ),
        duration_ms: 0,
    }
}

fn run_freshness(name: &str, obs: FreshnessObservation) -> CheckResult {
    if obs.hours_since_last_load <= obs.sla_hours {
        CheckResult {
            check_type: CheckType::DataFreshness,
            model: name.to_string(),
            status: CheckStatus::Pass,
            severity: Severity::Low,
            message: format!("fresh within SLA ({:.1}h / {:.1}h)", obs.hours_since_last_load, obs.sla_hours),
            detail: None,
            duration_ms: 0,
        }
    } else {
        let overage_ratio = obs.hours_since_last_load / obs.sla_hours.max(0.01);
        let severity = if overage_ratio >= 2.0 {
            Severity::Critical
        } else {
            Severity::High
        };
        CheckResult {
            check_type: CheckType::DataFreshness,
            model: name.to_string(),
            status: CheckStatus::Fail,
            severity,
            message: format!(
                "stale: last load {:.1}h ago exceeds SLA of {:.1}h",
                obs.hours_since_last_load, obs.sla_hours
            ),
            detail: None,
            duration_ms: 0,
        }
    }
}

fn run_volume_anomaly(name: &str, obs: VolumeObservation) -> CheckResult {
    if obs.baseline_row_count == 0 {
        return CheckResult {
            check_type: CheckType::VolumeAnomaly,
            model: name.to_string(),
            status: CheckStatus::Skip,
            severity: Severity::Low,
            message: "no baseline row count recorded".to_string(),
            detail: None,
            duration_ms: 0,
        };
    }
    let delta = (obs.row_count - obs.baseline_row_count) as f64 / obs.baseline_row_count as f64;
    if delta.abs() < 0.2 {
        CheckResult {
            check_type: CheckType::VolumeAnomaly,
            model: name.to_string(),
            status: CheckStatus::Pass,
            severity: Severity::Low,
            message: format!("row count within 20% of baseline ({:+.1}%)", delta * 100.0),
            detail: None,
            duration_ms: 0,
        }
    } else {
        let severity = if delta.abs() >= 0.8 {
            Severity::Critical
        } else {
            Severity::Medium
        };
        CheckResult {
            check_type: CheckType::VolumeAnomaly,
            model: name.to_string(),
            status: CheckStatus::Warn,
            severity,
            message: format!("row count deviates {:+.1}% from baseline", delta * 100.0),
            detail: Some(format!("{} vs baseline {}", obs.row_count, obs.baseline_row_count)),
            duration_ms: 0,
        }
    }
}
