use super::SqlDialect;
use sqlparser::ast::{ObjectName, Query, Select, SetExpr, Statement, TableFactor};

/// A catalog/schema rewrite rule: `(source_catalog, source_schema) ->
/// (target_catalog, target_schema)`.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub source_catalog: Option<String>,
    pub source_schema: String,
    pub target_catalog: Option<String>,
    pub target_schema: String,
}

/// Rewrite every table reference matching one of `rules` by mutating the
/// AST — this respects quoting, CTE boundaries, and subquery aliases
/// because it only ever touches `TableFactor::Table` name parts, never the
/// raw SQL text. On parse failure, returns the original SQL unchanged
/// (spec.md §4.1 failure semantics).
pub fn rewrite_tables(sql: &str, rules: &[RewriteRule], dialect: SqlDialect) -> String {
    let mut statements = match super::parse(sql, dialect) {
        Ok(s) => s,
        Err(_) => return sql.to_string(),
    };
    for stmt in statements.iter_mut() {
        if let Statement::Query(query) = stmt {
            rewrite_query(query, rules);
        }
    }
    let rendered: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
    rendered.join(";\n")
}

fn rewrite_query(query: &mut Query, rules: &[RewriteRule]) {
    if let Some(with) = query.with.as_mut() {
        for cte in with.cte_tables.iter_mut() {
            rewrite_query(&mut cte.query, rules);
        }
    }
    rewrite_set_expr(&mut query.body, rules);
}

fn rewrite_set_expr(set_expr: &mut SetExpr, rules: &[RewriteRule]) {
    match set_expr {
        SetExpr::Select(select) => rewrite_select(select, rules),
        SetExpr::Query(q) => rewrite_query(q, rules),
        SetExpr::SetOperation { left, right, .. } => {
            rewrite_set_expr(left, rules);
            rewrite_set_expr(right, rules);
        }
        _ => {}
    }
}

fn rewrite_select(select: &mut Select, rules: &[RewriteRule]) {
    for twj in select.from.iter_mut() {
        rewrite_table_factor(&mut twj.relation, rules);
        for join in twj.joins.iter_mut() {
            rewrite_table_factor(&mut join.relation, rules);
        }
    }
}

fn rewrite_table_factor(factor: &mut TableFactor, rules: &[RewriteRule]) {
    if let TableFactor::Table { name, .. } = factor {
        if let Some(rewritten) = rewrite_name(name, rules) {
            *name = rewritten;
        }
    }
}

fn rewrite_name(name: &ObjectName, rules: &[RewriteRule]) -> Option<ObjectName> {
    let parts: Vec<String> = name.0.iter().map(|i| i.to_string()).collect();
    let (catalog, schema, table) = match parts.len() {
        3 => (Some(parts[0].clone()), parts[1].clone(), parts[2].clone()),
        2 => (None, parts[0].clone(), parts[1].clone()),
        _ => return None,
    };

    for rule in rules {
        let catalog_matches = rule.source_catalog.as_deref() == catalog.as_deref();
        if catalog_matches && rule.source_schema == schema {
            let mut new_parts = Vec::new();
            if let Some(tc) = &rule.target_catalog {
                new_parts.push(sqlparser::ast::Ident::new(tc.clone()));
            }
            new_parts.push(sqlparser::ast::Ident::new(rule.target_schema.clone()));
            new_parts.push(sqlparser::ast::Ident::new(table.clone()));
            return Some(ObjectName(new_parts));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_matching_schema() {
        let rules = vec![RewriteRule {
            source_catalog: None,
            source_schema: "staging".to_string(),
            target_catalog: None,
            target_schema: "archive".to_string(),
        }];
        let out = rewrite_tables("SELECT * FROM staging.orders", &rules, SqlDialect::Redshift);
        assert!(out.contains("archive.orders"));
    }

    #[test]
    fn leaves_non_matching_schema_untouched() {
        let rules = vec![RewriteRule {
            source_catalog: None,
            source_schema: "staging".to_string(),
            target_catalog: None,
            target_schema: "archive".to_string(),
        }];
        let out = rewrite_tables("SELECT * FROM analytics.orders", &rules, SqlDialect::Redshift);
        assert!(out.contains("analytics.orders"));
    }

    #[test]
    fn parse_failure_returns_original_sql() {
        let rules: Vec<RewriteRule> = Vec::new();
        let sql = "NOT VALID SQL (((";
        assert_eq!(rewrite_tables(sql, &rules, SqlDialect::Redshift), sql);
    }
}
