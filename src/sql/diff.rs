use super::normalize::{normalize, output_columns, NormalizeVersion};
use super::SqlDialect;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ColumnChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub is_identical: bool,
    pub is_cosmetic_only: bool,
    pub edits: Vec<Edit>,
    pub column_changes: BTreeMap<String, ColumnChangeKind>,
}

impl DiffResult {
    /// Conservative default used when either input fails to parse: never
    /// cosmetic, always treated as a real (breaking-candidate) change.
    fn non_cosmetic_fallback(reason: &str) -> Self {
        Self {
            is_identical: false,
            is_cosmetic_only: false,
            edits: vec![Edit {
                description: format!("parse failure, defaulting to modified: {reason}"),
            }],
            column_changes: BTreeMap::new(),
        }
    }
}

/// Compare normalised ASTs of `old` and `new` under `dialect`. A parse
/// failure on either side degrades conservatively to a non-cosmetic diff
/// (spec.md §4.1 failure semantics) rather than propagating the error.
pub fn diff(old: &str, new: &str, dialect: SqlDialect) -> DiffResult {
    let old_norm = match normalize(old, dialect, NormalizeVersion::V1) {
        Ok(s) => s,
        Err(e) => return DiffResult::non_cosmetic_fallback(&e.to_string()),
    };
    let new_norm = match normalize(new, dialect, NormalizeVersion::V1) {
        Ok(s) => s,
        Err(e) => return DiffResult::non_cosmetic_fallback(&e.to_string()),
    };

    if old_norm == new_norm {
        return DiffResult {
            is_identical: true,
            is_cosmetic_only: true,
            edits: Vec::new(),
            column_changes: BTreeMap::new(),
        };
    }

    let old_stmts = super::parse(old, dialect).ok();
    let new_stmts = super::parse(new, dialect).ok();

    let column_changes = match (&old_stmts, &new_stmts) {
        (Some(o), Some(n)) if !o.is_empty() && !n.is_empty() => {
            diff_columns(&output_columns(&o[0]), &output_columns(&n[0]))
        }
        _ => BTreeMap::new(),
    };

    let edits = line_diff(&old_norm, &new_norm);

    // Whitespace/casing-only differences are already collapsed by
    // normalize() at V1; anything still different here is a real edit, so
    // `is_cosmetic_only` is false whenever the normalized forms differ.
    DiffResult {
        is_identical: false,
        is_cosmetic_only: false,
        edits,
        column_changes,
    }
}

fn diff_columns(
    old_cols: &[(String, String)],
    new_cols: &[(String, String)],
) -> BTreeMap<String, ColumnChangeKind> {
    let old_map: HashMap<&str, &str> = old_cols
        .iter()
        .map(|(n, e)| (n.as_str(), e.as_str()))
        .collect();
    let new_map: HashMap<&str, &str> = new_cols
        .iter()
        .map(|(n, e)| (n.as_str(), e.as_str()))
        .collect();

    let mut out = BTreeMap::new();
    for (name, expr) in old_cols {
        match new_map.get(name.as_str()) {
            None => {
                out.insert(name.clone(), ColumnChangeKind::Removed);
            }
            Some(new_expr) => {
                if *new_expr != expr.as_str() {
                    out.insert(name.clone(), ColumnChangeKind::Modified);
                }
            }
        }
    }
    for (name, _) in new_cols {
        if !old_map.contains_key(name.as_str()) {
            out.insert(name.clone(), ColumnChangeKind::Added);
        }
    }
    out
}

/// Minimal line-level LCS diff. No external diff crate is in the dependency
/// set, and the inputs here are normalized single-statement SQL strings, so
/// a small self-contained O(n*m) DP is sufficient.
fn line_diff(old: &str, new: &str) -> Vec<Edit> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let (n, m) = (old_lines.len(), new_lines.len());

    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old_lines[i] == new_lines[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut edits = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old_lines[i] == new_lines[j] {
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            edits.push(Edit {
                description: format!("- {}", old_lines[i]),
            });
            i += 1;
        } else {
            edits.push(Edit {
                description: format!("+ {}", new_lines[j]),
            });
            j += 1;
        }
    }
    while i < n {
        edits.push(Edit {
            description: format!("- {}", old_lines[i]),
        });
        i += 1;
    }
    while j < m {
        edits.push(Edit {
            description: format!("+ {}", new_lines[j]),
        });
        j += 1;
    }
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmetic_only_change_is_detected() {
        let old = "SELECT a FROM t";
        let new = "select   a\nfrom t";
        let result = diff(old, new, SqlDialect::Redshift);
        assert!(result.is_cosmetic_only);
    }

    #[test]
    fn column_expression_change_is_modified() {
        let old = "SELECT SUM(amount) AS total FROM t";
        let new = "SELECT AVG(amount) AS total FROM t";
        let result = diff(old, new, SqlDialect::Redshift);
        assert!(!result.is_cosmetic_only);
        assert_eq!(
            result.column_changes.get("total"),
            Some(&ColumnChangeKind::Modified)
        );
    }

    #[test]
    fn parse_failure_degrades_to_non_cosmetic() {
        let result = diff("SELECT 1", "NOT VALID SQL (((", SqlDialect::Redshift);
        assert!(!result.is_cosmetic_only);
    }
}
