//! SQL canonicalisation, hashing, diffing, rewriting, and lineage tracing.
//!
//! Every operation here is pure and returns a parse-failure outcome rather
//! than panicking: callers default conservatively (diff -> MODIFIED,
//! rewrite -> unchanged SQL, normalize -> error) per spec.md §4.1.

mod dialect;
mod diff;
mod hash;
mod lineage;
mod normalize;
mod rewrite;

pub use dialect::IronlayerDialect;
pub use diff::{diff, ColumnChangeKind, DiffResult, Edit};
pub use hash::content_hash;
pub use lineage::{trace_column_lineage, ColumnLineage, TransformKind};
pub use normalize::{normalize, normalize_with_qualify, output_columns, NormalizeVersion, QualifyMap};
pub use rewrite::{rewrite_tables, RewriteRule};

use crate::error::{IronlayerError, Result};
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, GenericDialect};
use sqlparser::parser::Parser;

/// The SQL dialect a model's raw SQL is written in. Redshift is treated as
/// ANSI-flavoured `GenericDialect`; Databricks widens identifier rules via
/// `IronlayerDialect` (see dialect.rs for the rationale — sqlparser has no
/// upstream Databricks dialect as of 0.60).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Databricks,
    Redshift,
}

impl SqlDialect {
    fn as_dyn(self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Databricks => Box::new(IronlayerDialect::new()),
            SqlDialect::Redshift => Box::new(GenericDialect {}),
        }
    }
}

/// Parse `sql` under `dialect`, returning the statement list. Fails with a
/// `ParseError` carrying the parser's own message on invalid SQL — never
/// panics.
pub fn parse(sql: &str, dialect: SqlDialect) -> Result<Vec<Statement>> {
    let dialect_impl = dialect.as_dyn();
    Parser::parse_sql(dialect_impl.as_ref(), sql)
        .map_err(|e| IronlayerError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_garbage() {
        let err = parse("SELEKT * FORM x", SqlDialect::Redshift).unwrap_err();
        assert_eq!(err.kind(), "PARSE_ERROR");
    }

    #[test]
    fn parse_accepts_simple_select() {
        let stmts = parse("SELECT 1", SqlDialect::Redshift).unwrap();
        assert_eq!(stmts.len(), 1);
    }
}
