use crate::sql::{diff, ColumnChangeKind, SqlDialect};
use serde::{Deserialize, Serialize};

/// Deterministic change classification, ordered from least to most severe.
/// `severity()` is used when propagating the most-severe classification
/// downstream through the forward closure (spec.md §4.4 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Cosmetic,
    RenameOnly,
    NonBreaking,
    PartitionShift,
    MetricSemantic,
    Breaking,
}

impl ChangeKind {
    fn severity(self) -> u8 {
        match self {
            ChangeKind::Cosmetic => 0,
            ChangeKind::RenameOnly => 1,
            ChangeKind::NonBreaking => 2,
            ChangeKind::PartitionShift => 3,
            ChangeKind::MetricSemantic => 4,
            ChangeKind::Breaking => 5,
        }
    }

    pub fn most_severe(self, other: ChangeKind) -> ChangeKind {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn requires_full_refresh(self) -> bool {
        matches!(self, ChangeKind::Breaking | ChangeKind::MetricSemantic)
    }

    pub fn triggers_downstream_rebuild(self) -> bool {
        matches!(self, ChangeKind::Breaking | ChangeKind::MetricSemantic)
    }
}

const AGGREGATE_MARKERS: [&str; 6] = ["SUM(", "AVG(", "COUNT(", "MIN(", "MAX(", "STDDEV("];

/// Classify the change between `old_sql` and `new_sql` using deterministic
/// rules over AST-level edits. Returns `Cosmetic` directly when the SQL
/// toolkit diff says so; otherwise inspects column-level changes to
/// distinguish renames, metric-semantic changes (aggregate function swaps),
/// partition-shape changes, and generic breaking/non-breaking edits.
pub fn classify_change(old_sql: &str, new_sql: &str, dialect: SqlDialect) -> ChangeKind {
    let result = diff(old_sql, new_sql, dialect);
    if result.is_cosmetic_only {
        return ChangeKind::Cosmetic;
    }

    let added: Vec<&str> = result
        .column_changes
        .iter()
        .filter(|(_, k)| **k == ColumnChangeKind::Added)
        .map(|(name, _)| name.as_str())
        .collect();
    let removed: Vec<&str> = result
        .column_changes
        .iter()
        .filter(|(_, k)| **k == ColumnChangeKind::Removed)
        .map(|(name, _)| name.as_str())
        .collect();
    let modified: Vec<&str> = result
        .column_changes
        .iter()
        .filter(|(_, k)| **k == ColumnChangeKind::Modified)
        .map(|(name, _)| name.as_str())
        .collect();

    if added.len() == 1 && removed.len() == 1 && modified.is_empty() {
        return ChangeKind::RenameOnly;
    }

    if !removed.is_empty() {
        return ChangeKind::Breaking;
    }

    if !modified.is_empty() {
        let swaps_aggregate = result.edits.iter().any(|e| {
            let text = &e.description;
            AGGREGATE_MARKERS
                .iter()
                .filter(|marker| text.contains(*marker))
                .count()
                >= 1
        });
        if swaps_aggregate {
            return ChangeKind::MetricSemantic;
        }
    }

    if !added.is_empty() {
        return ChangeKind::NonBreaking;
    }

    let mentions_partition = result
        .edits
        .iter()
        .any(|e| e.description.to_uppercase().contains("PARTITION"));
    if mentions_partition {
        return ChangeKind::PartitionShift;
    }

    ChangeKind::NonBreaking
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmetic_change_classified_cosmetic() {
        let kind = classify_change("SELECT a FROM t", "select   a\nfrom t", SqlDialect::Redshift);
        assert_eq!(kind, ChangeKind::Cosmetic);
    }

    #[test]
    fn aggregate_swap_is_metric_semantic() {
        let kind = classify_change(
            "SELECT SUM(amount) AS total FROM t",
            "SELECT AVG(amount) AS total FROM t",
            SqlDialect::Redshift,
        );
        assert_eq!(kind, ChangeKind::MetricSemantic);
    }

    #[test]
    fn dropped_column_is_breaking() {
        let kind = classify_change(
            "SELECT a, b FROM t",
            "SELECT a FROM t",
            SqlDialect::Redshift,
        );
        assert_eq!(kind, ChangeKind::Breaking);
    }

    #[test]
    fn added_column_is_non_breaking() {
        let kind = classify_change(
            "SELECT a FROM t",
            "SELECT a, b FROM t",
            SqlDialect::Redshift,
        );
        assert_eq!(kind, ChangeKind::NonBreaking);
    }

    #[test]
    fn severity_ordering_picks_most_severe() {
        assert_eq!(
            ChangeKind::NonBreaking.most_severe(ChangeKind::Breaking),
            ChangeKind::Breaking
        );
        assert_eq!(
            ChangeKind::Breaking.most_severe(ChangeKind::Cosmetic),
            ChangeKind::Breaking
        );
    }
}
