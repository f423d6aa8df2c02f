use super::SqlDialect;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{Expr, Query, Select, SelectItem, SetExpr, Statement, TableFactor};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransformKind {
    /// Output column is a bare reference to a source column.
    Passthrough,
    /// Output column passes through an aggregate function (SUM, AVG, ...).
    Aggregate,
    /// Output column is computed from an expression over one or more
    /// source columns.
    Expression,
    /// Output column has no traceable source (literal, subquery, `*`).
    Opaque,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnLineage {
    pub output_column: String,
    pub source_table: Option<String>,
    pub source_column: Option<String>,
    pub transform: TransformKind,
}

/// Trace column-level lineage for the first statement in `sql`. On parse
/// failure returns an empty lineage list rather than propagating the error.
pub fn trace_column_lineage(sql: &str, dialect: SqlDialect) -> Vec<ColumnLineage> {
    let statements = match super::parse(sql, dialect) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let Some(Statement::Query(query)) = statements.into_iter().next() else {
        return Vec::new();
    };
    let aliases = collect_table_aliases(&query);
    let Some(select) = top_level_select(&query) else {
        return Vec::new();
    };
    select
        .projection
        .iter()
        .map(|item| trace_item(item, &aliases))
        .collect()
}

fn top_level_select(query: &Query) -> Option<&Select> {
    match query.body.as_ref() {
        SetExpr::Select(select) => Some(select.as_ref()),
        _ => None,
    }
}

/// Map every alias (or bare table name) visible in the FROM/JOIN clause to
/// its underlying table name. Single-table queries resolve unqualified
/// columns unambiguously; multi-table queries without an explicit qualifier
/// are left `Opaque` rather than guessed at.
fn collect_table_aliases(query: &Query) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let SetExpr::Select(select) = query.body.as_ref() {
        for twj in &select.from {
            collect_from_factor(&twj.relation, &mut out);
            for join in &twj.joins {
                collect_from_factor(&join.relation, &mut out);
            }
        }
    }
    out
}

fn collect_from_factor(factor: &TableFactor, out: &mut BTreeMap<String, String>) {
    if let TableFactor::Table { name, alias, .. } = factor {
        let table_name = name.to_string();
        let key = alias
            .as_ref()
            .map(|a| a.name.value.clone())
            .unwrap_or_else(|| table_name.clone());
        out.insert(key, table_name);
    }
}

fn trace_item(item: &SelectItem, aliases: &BTreeMap<String, String>) -> ColumnLineage {
    match item {
        SelectItem::UnnamedExpr(expr) => trace_expr(&format!("{expr}"), expr, aliases),
        SelectItem::ExprWithAlias { expr, alias } => {
            let mut lineage = trace_expr(&alias.value, expr, aliases);
            lineage.output_column = alias.value.clone();
            lineage
        }
        SelectItem::QualifiedWildcard(name, _) => ColumnLineage {
            output_column: format!("{name}.*"),
            source_table: Some(name.to_string()),
            source_column: Some("*".to_string()),
            transform: TransformKind::Passthrough,
        },
        SelectItem::Wildcard(_) => ColumnLineage {
            output_column: "*".to_string(),
            source_table: None,
            source_column: Some("*".to_string()),
            transform: TransformKind::Opaque,
        },
    }
}

fn trace_expr(output_name: &str, expr: &Expr, aliases: &BTreeMap<String, String>) -> ColumnLineage {
    match expr {
        Expr::Identifier(ident) => {
            let (table, has_single_source) = single_source(aliases);
            ColumnLineage {
                output_column: output_name.to_string(),
                source_table: table,
                source_column: if has_single_source {
                    Some(ident.value.clone())
                } else {
                    None
                },
                transform: TransformKind::Passthrough,
            }
        }
        Expr::CompoundIdentifier(parts) if parts.len() == 2 => {
            let qualifier = parts[0].value.clone();
            let column = parts[1].value.clone();
            ColumnLineage {
                output_column: output_name.to_string(),
                source_table: aliases.get(&qualifier).cloned().or(Some(qualifier)),
                source_column: Some(column),
                transform: TransformKind::Passthrough,
            }
        }
        Expr::Function(func) => {
            let table = single_source(aliases).0;
            ColumnLineage {
                output_column: output_name.to_string(),
                source_table: table,
                source_column: first_identifier_in_function(func),
                transform: TransformKind::Aggregate,
            }
        }
        Expr::Value(_) | Expr::Subquery(_) => ColumnLineage {
            output_column: output_name.to_string(),
            source_table: None,
            source_column: None,
            transform: TransformKind::Opaque,
        },
        _ => {
            let table = single_source(aliases).0;
            ColumnLineage {
                output_column: output_name.to_string(),
                source_table: table,
                source_column: None,
                transform: TransformKind::Expression,
            }
        }
    }
}

fn single_source(aliases: &BTreeMap<String, String>) -> (Option<String>, bool) {
    if aliases.len() == 1 {
        let (_, table) = aliases.iter().next().unwrap();
        (Some(table.clone()), true)
    } else {
        (None, false)
    }
}

fn first_identifier_in_function(func: &sqlparser::ast::Function) -> Option<String> {
    use sqlparser::ast::{FunctionArg, FunctionArgExpr, FunctionArguments};
    if let FunctionArguments::List(list) = &func.args {
        for arg in &list.args {
            let expr = match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Some(e),
                FunctionArg::Named { arg: FunctionArgExpr::Expr(e), .. } => Some(e),
                _ => None,
            };
            if let Some(Expr::Identifier(ident)) = expr {
                return Some(ident.value.clone());
            }
            if let Some(Expr::CompoundIdentifier(parts)) = expr {
                return parts.last().map(|p| p.value.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traces_single_table_passthrough() {
        let lineage = trace_column_lineage("SELECT amount FROM orders", SqlDialect::Redshift);
        assert_eq!(lineage.len(), 1);
        assert_eq!(lineage[0].source_table.as_deref(), Some("orders"));
        assert_eq!(lineage[0].source_column.as_deref(), Some("amount"));
        assert_eq!(lineage[0].transform, TransformKind::Passthrough);
    }

    #[test]
    fn traces_aggregate() {
        let lineage =
            trace_column_lineage("SELECT SUM(amount) AS total FROM orders", SqlDialect::Redshift);
        assert_eq!(lineage[0].output_column, "total");
        assert_eq!(lineage[0].transform, TransformKind::Aggregate);
        assert_eq!(lineage[0].source_column.as_deref(), Some("amount"));
    }

    #[test]
    fn parse_failure_yields_empty_lineage() {
        assert!(trace_column_lineage("NOT VALID (((", SqlDialect::Redshift).is_empty());
    }
}
