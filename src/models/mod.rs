//! Model definitions, the file loader, and the `ref()` resolver.

mod loader;
mod resolver;

pub use loader::{FileProvider, LocalFsProvider, ModelHeader};
pub use resolver::{RefResolver, ResolvedModel};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelKind {
    FullRefresh,
    IncrementalByTimeRange,
    AppendOnly,
    MergeByKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialization {
    Table,
    View,
    IncrementalTable,
    Ephemeral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnContract {
    pub column: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredTest {
    pub name: String,
    pub column: Option<String>,
}

/// An immutable model definition produced by the loader at a given
/// revision. A new definition is produced for a new revision; nothing here
/// is ever mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub canonical_name: String,
    pub kind: ModelKind,
    pub materialization: Materialization,
    pub raw_sql: String,
    pub clean_sql: String,
    pub content_hash: String,
    pub referenced_tables: Vec<String>,
    pub output_columns: Vec<String>,
    pub column_contracts: Vec<ColumnContract>,
    pub tests: Vec<DeclaredTest>,
    pub time_column: Option<String>,
    pub unique_key: Option<String>,
    pub tags: Vec<String>,
}

impl ModelDefinition {
    /// Validates the three structural invariants from spec.md §3: an
    /// INCREMENTAL_BY_TIME_RANGE model needs a time column, a MERGE_BY_KEY
    /// model needs a unique key, and clean_sql must have no leftover
    /// `ref()` macros.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::IronlayerError;
        if self.kind == ModelKind::IncrementalByTimeRange && self.time_column.is_none() {
            return Err(IronlayerError::Validation(format!(
                "model '{}' is INCREMENTAL_BY_TIME_RANGE but declares no time_column",
                self.canonical_name
            )));
        }
        if self.kind == ModelKind::MergeByKey && self.unique_key.is_none() {
            return Err(IronlayerError::Validation(format!(
                "model '{}' is MERGE_BY_KEY but declares no unique_key",
                self.canonical_name
            )));
        }
        if self.clean_sql.contains("{{") || self.clean_sql.contains("ref(") {
            return Err(IronlayerError::Validation(format!(
                "model '{}' clean_sql still contains an unresolved ref() macro",
                self.canonical_name
            )));
        }
        Ok(())
    }
}

/// Immutable mapping from canonical name to content hash at a revision.
pub type Snapshot = BTreeMap<String, String>;

pub fn snapshot_from_models(models: &BTreeMap<String, ModelDefinition>) -> Snapshot {
    models
        .iter()
        .map(|(name, def)| (name.clone(), def.content_hash.clone()))
        .collect()
}
