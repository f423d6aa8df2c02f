use sqlparser::dialect::{Dialect, GenericDialect};

/// Databricks stand-in dialect. sqlparser has no upstream `DatabricksDialect`
/// as of 0.60, so this wraps `GenericDialect` and widens identifier rules to
/// accept the backtick-quoting and `${...}` substitution markers Databricks
/// SQL files commonly carry in header comments (stripped during
/// normalization, never part of the AST). See DESIGN.md for the Open
/// Question this resolves.
#[derive(Debug, Default)]
pub struct IronlayerDialect {
    inner: GenericDialect,
}

impl IronlayerDialect {
    pub fn new() -> Self {
        Self {
            inner: GenericDialect {},
        }
    }
}

impl Dialect for IronlayerDialect {
    fn is_identifier_start(&self, ch: char) -> bool {
        self.inner.is_identifier_start(ch) || ch == '$'
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        self.inner.is_identifier_part(ch) || ch == '$'
    }

    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        ch == '`' || self.inner.is_delimited_identifier_start(ch)
    }
}
