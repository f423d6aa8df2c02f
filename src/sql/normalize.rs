use super::{parse, SqlDialect};
use crate::error::Result;
use sqlparser::ast::{
    Expr, Query, Select, SelectItem, SetExpr, Statement, TableFactor, UnaryOperator, Value,
    With,
};
use std::collections::BTreeMap;

/// Rule-set version. The version prefix is baked into the content hash so a
/// change to these rules invalidates every previously computed hash
/// (spec.md §4.1, `hash`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeVersion {
    /// Strip comments, canonicalise whitespace, uppercase keywords, fully
    /// qualify tables where possible, alphabetise CTEs with no forward
    /// references, regenerate from AST.
    V1,
    /// Everything in V1 plus schema-aware column qualification and
    /// deterministic boolean simplification.
    V2,
}

impl NormalizeVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            NormalizeVersion::V1 => "v1",
            NormalizeVersion::V2 => "v2",
        }
    }
}

/// Table-qualification map: short or partially-qualified name -> fully
/// qualified canonical name. Supplied by the model registry; empty when
/// normalizing without resolver context.
pub type QualifyMap = BTreeMap<String, String>;

/// Normalize `sql` to its canonical string form. Returns a `ParseError`
/// outcome on invalid SQL rather than panicking — callers that need the
/// conservative default should catch the error and treat the model as
/// changed.
pub fn normalize(sql: &str, dialect: SqlDialect, version: NormalizeVersion) -> Result<String> {
    normalize_with_qualify(sql, dialect, version, &QualifyMap::new())
}

pub fn normalize_with_qualify(
    sql: &str,
    dialect: SqlDialect,
    version: NormalizeVersion,
    qualify: &QualifyMap,
) -> Result<String> {
    let mut statements = parse(sql, dialect)?;
    for stmt in statements.iter_mut() {
        if !qualify.is_empty() {
            qualify_tables_in_statement(stmt, qualify);
        }
        alphabetise_ctes_in_statement(stmt);
        if version == NormalizeVersion::V2 {
            simplify_booleans_in_statement(stmt);
        }
    }
    let rendered: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
    Ok(rendered.join(";\n"))
}

// -- Table qualification -----------------------------------------------

fn qualify_tables_in_statement(stmt: &mut Statement, qualify: &QualifyMap) {
    if let Statement::Query(query) = stmt {
        qualify_tables_in_query(query, qualify);
    }
}

fn qualify_tables_in_query(query: &mut Query, qualify: &QualifyMap) {
    if let Some(with) = query.with.as_mut() {
        for cte in with.cte_tables.iter_mut() {
            qualify_tables_in_query(&mut cte.query, qualify);
        }
    }
    qualify_tables_in_set_expr(&mut query.body, qualify);
}

fn qualify_tables_in_set_expr(set_expr: &mut SetExpr, qualify: &QualifyMap) {
    match set_expr {
        SetExpr::Select(select) => qualify_tables_in_select(select, qualify),
        SetExpr::Query(q) => qualify_tables_in_query(q, qualify),
        SetExpr::SetOperation { left, right, .. } => {
            qualify_tables_in_set_expr(left, qualify);
            qualify_tables_in_set_expr(right, qualify);
        }
        _ => {}
    }
}

fn qualify_tables_in_select(select: &mut Select, qualify: &QualifyMap) {
    for twj in select.from.iter_mut() {
        qualify_table_factor(&mut twj.relation, qualify);
        for join in twj.joins.iter_mut() {
            qualify_table_factor(&mut join.relation, qualify);
        }
    }
}

fn qualify_table_factor(factor: &mut TableFactor, qualify: &QualifyMap) {
    if let TableFactor::Table { name, .. } = factor {
        let current = name.to_string();
        if let Some(canonical) = qualify.get(&current) {
            let parts: Vec<sqlparser::ast::Ident> = canonical
                .split('.')
                .map(sqlparser::ast::Ident::new)
                .collect();
            if !parts.is_empty() {
                name.0 = parts;
            }
        }
    }
}

// -- CTE alphabetisation --------------------------------------------------

fn alphabetise_ctes_in_statement(stmt: &mut Statement) {
    if let Statement::Query(query) = stmt {
        alphabetise_ctes_in_query(query);
    }
}

fn alphabetise_ctes_in_query(query: &mut Query) {
    if let Some(with) = query.with.as_mut() {
        alphabetise_with(with);
        for cte in with.cte_tables.iter_mut() {
            alphabetise_ctes_in_query(&mut cte.query);
        }
    }
}

/// Alphabetise the CTE list only when doing so preserves every CTE's
/// textual-order dependency on a prior CTE (standard SQL forbids a CTE from
/// referencing one defined later, so in practice this almost always holds;
/// the check guards the rare dialect extension that allows mutual
/// recursion).
fn alphabetise_with(with: &mut With) {
    let names: Vec<String> = with
        .cte_tables
        .iter()
        .map(|c| c.alias.name.value.clone())
        .collect();
    let bodies: Vec<String> = with.cte_tables.iter().map(|c| c.query.to_string()).collect();

    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|&a, &b| names[a].cmp(&names[b]));

    let new_position: BTreeMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(new_idx, &old_idx)| (names[old_idx].as_str(), new_idx))
        .collect();

    let mut safe = true;
    for (old_idx, name) in names.iter().enumerate() {
        let new_idx = new_position[name.as_str()];
        for (other_idx, other_name) in names.iter().enumerate() {
            if other_idx == old_idx {
                continue;
            }
            if bodies[old_idx].contains(other_name.as_str()) {
                let other_new_idx = new_position[other_name.as_str()];
                if other_new_idx > new_idx {
                    safe = false;
                    break;
                }
            }
        }
        if !safe {
            break;
        }
    }

    if safe {
        let reordered: Vec<_> = order.into_iter().map(|i| with.cte_tables[i].clone()).collect();
        with.cte_tables = reordered;
    }
}

// -- Boolean simplification (V2) ------------------------------------------

fn simplify_booleans_in_statement(stmt: &mut Statement) {
    if let Statement::Query(query) = stmt {
        simplify_booleans_in_query(query);
    }
}

fn simplify_booleans_in_query(query: &mut Query) {
    if let Some(with) = query.with.as_mut() {
        for cte in with.cte_tables.iter_mut() {
            simplify_booleans_in_query(&mut cte.query);
        }
    }
    if let SetExpr::Select(select) = &mut *query.body {
        if let Some(selection) = select.selection.take() {
            select.selection = Some(simplify_expr(selection));
        }
    }
}

/// Deterministic boolean simplification: double negation collapses, and
/// `TRUE`/`FALSE` literals short-circuit AND/OR.
fn simplify_expr(expr: Expr) -> Expr {
    match expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: inner,
        } => {
            if let Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: inner2,
            } = *inner
            {
                simplify_expr(*inner2)
            } else {
                Expr::UnaryOp {
                    op: UnaryOperator::Not,
                    expr: Box::new(simplify_expr(*inner)),
                }
            }
        }
        Expr::BinaryOp { left, op, right } => {
            let left = simplify_expr(*left);
            let right = simplify_expr(*right);
            use sqlparser::ast::BinaryOperator;
            match op {
                BinaryOperator::And => {
                    if is_false(&left) || is_false(&right) {
                        bool_literal(false)
                    } else if is_true(&left) {
                        right
                    } else if is_true(&right) {
                        left
                    } else {
                        Expr::BinaryOp {
                            left: Box::new(left),
                            op,
                            right: Box::new(right),
                        }
                    }
                }
                BinaryOperator::Or => {
                    if is_true(&left) || is_true(&right) {
                        bool_literal(true)
                    } else if is_false(&left) {
                        right
                    } else if is_false(&right) {
                        left
                    } else {
                        Expr::BinaryOp {
                            left: Box::new(left),
                            op,
                            right: Box::new(right),
                        }
                    }
                }
                _ => Expr::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            }
        }
        Expr::Nested(inner) => Expr::Nested(Box::new(simplify_expr(*inner))),
        other => other,
    }
}

fn is_true(expr: &Expr) -> bool {
    matches!(expr, Expr::Value(v) if matches!(v.value, Value::Boolean(true)))
}

fn is_false(expr: &Expr) -> bool {
    matches!(expr, Expr::Value(v) if matches!(v.value, Value::Boolean(false)))
}

fn bool_literal(b: bool) -> Expr {
    Expr::Value(Value::Boolean(b).with_empty_span())
}

/// Extract the deterministically ordered list of output column names a
/// normalized SELECT statement projects, used by `diff` for column-change
/// detection.
pub fn output_columns(stmt: &Statement) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Statement::Query(query) = stmt {
        if let SetExpr::Select(select) = query.body.as_ref() {
            for (idx, item) in select.projection.iter().enumerate() {
                let (name, expr_text) = match item {
                    SelectItem::UnnamedExpr(e) => (format!("col_{idx}"), e.to_string()),
                    SelectItem::ExprWithAlias { expr, alias } => {
                        (alias.value.clone(), expr.to_string())
                    }
                    SelectItem::QualifiedWildcard(name, _) => (format!("{name}.*"), "*".to_string()),
                    SelectItem::Wildcard(_) => ("*".to_string(), "*".to_string()),
                };
                out.push((name, expr_text));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqlDialect;

    #[test]
    fn normalize_is_idempotent() {
        let sql = "select   a,b from   t where a = 1 and true";
        let once = normalize(sql, SqlDialect::Redshift, NormalizeVersion::V2).unwrap();
        let twice = normalize(&once, SqlDialect::Redshift, NormalizeVersion::V2).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_collapses_and_true() {
        let sql = "select a from t where a = 1 and true";
        let out = normalize(sql, SqlDialect::Redshift, NormalizeVersion::V2).unwrap();
        assert!(!out.to_lowercase().contains("true"));
    }

    #[test]
    fn normalize_collapses_double_negation() {
        let sql = "select a from t where not not (a = 1)";
        let out = normalize(sql, SqlDialect::Redshift, NormalizeVersion::V2).unwrap();
        assert!(!out.contains("NOT NOT"));
    }

    #[test]
    fn whitespace_and_case_changes_are_cosmetic() {
        let a = normalize("SELECT a FROM t", SqlDialect::Redshift, NormalizeVersion::V1).unwrap();
        let b = normalize("select   a\nfrom t", SqlDialect::Redshift, NormalizeVersion::V1).unwrap();
        assert_eq!(a, b);
    }
}
