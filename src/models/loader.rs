use super::{ColumnContract, DeclaredTest, Materialization, ModelDefinition, ModelKind};
use crate::error::{IronlayerError, Result};
use crate::sql::{self, NormalizeVersion, QualifyMap, SqlDialect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Declared header metadata a `.sql` file carries as a leading
/// `-- ironlayer: { ... }` comment line containing a JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelHeader {
    pub name: String,
    pub kind: ModelKind,
    #[serde(default = "default_materialization")]
    pub materialization: Materialization,
    pub time_column: Option<String>,
    pub unique_key: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub contracts: Vec<ColumnContract>,
    #[serde(default)]
    pub tests: Vec<DeclaredTest>,
}

fn default_materialization() -> Materialization {
    Materialization::Table
}

const HEADER_PREFIX: &str = "-- ironlayer:";

/// Decouples the loader from the out-of-scope Git collaborator (spec.md
/// §1): the loader only ever asks for file bytes at a path, never for
/// revision metadata or diffs.
pub trait FileProvider {
    fn list_sql_files(&self) -> Result<Vec<PathBuf>>;
    fn read_file(&self, path: &Path) -> Result<String>;
}

/// Test/local-mode provider that reads directly from the filesystem.
pub struct LocalFsProvider {
    root: PathBuf,
}

impl LocalFsProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileProvider for LocalFsProvider {
    fn list_sql_files(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        visit_dir(&self.root, &mut out)?;
        out.sort();
        Ok(out)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(IronlayerError::Io)
    }
}

fn visit_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            visit_dir(&path, out)?;
        } else if path.extension().map(|e| e == "sql").unwrap_or(false) {
            out.push(path);
        }
    }
    Ok(())
}

/// Parses one `.sql` file's header and body. The body still contains
/// unresolved `{{ ref('name') }}` macros at this stage — resolution happens
/// in `resolver::RefResolver`.
pub fn parse_file(contents: &str) -> Result<(ModelHeader, String)> {
    let mut lines = contents.lines();
    let first = lines.next().unwrap_or("");
    if !first.trim_start().starts_with(HEADER_PREFIX) {
        return Err(IronlayerError::Validation(
            "model file missing leading '-- ironlayer:' header".to_string(),
        ));
    }
    let json_part = first.trim_start()[HEADER_PREFIX.len()..].trim();
    let header: ModelHeader = serde_json::from_str(json_part)
        .map_err(|e| IronlayerError::Validation(format!("invalid model header: {e}")))?;
    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((header, body))
}

/// Build a `ModelDefinition` from an already-ref-resolved `clean_sql`.
/// `referenced_tables` and `output_columns` are derived from the SQL
/// toolkit's lineage tracer rather than re-parsed ad hoc.
pub fn build_definition(
    header: &ModelHeader,
    raw_sql: &str,
    clean_sql: &str,
    dialect: SqlDialect,
    qualify: &QualifyMap,
) -> Result<ModelDefinition> {
    let normalized = sql::normalize_with_qualify(clean_sql, dialect, NormalizeVersion::V2, qualify)?;
    let mut metadata = BTreeMap::new();
    metadata.insert("kind".to_string(), format!("{:?}", header.kind));
    metadata.insert(
        "materialization".to_string(),
        format!("{:?}", header.materialization),
    );
    let content_hash = sql::content_hash(&normalized, NormalizeVersion::V2, &metadata);

    let lineage = sql::trace_column_lineage(clean_sql, dialect);
    let mut referenced_tables: Vec<String> = lineage
        .iter()
        .filter_map(|l| l.source_table.clone())
        .collect();
    referenced_tables.sort();
    referenced_tables.dedup();
    let output_columns: Vec<String> = lineage.iter().map(|l| l.output_column.clone()).collect();

    let definition = ModelDefinition {
        canonical_name: header.name.clone(),
        kind: header.kind,
        materialization: header.materialization.clone(),
        raw_sql: raw_sql.to_string(),
        clean_sql: clean_sql.to_string(),
        content_hash,
        referenced_tables,
        output_columns,
        column_contracts: header.contracts.clone(),
        tests: header.tests.clone(),
        time_column: header.time_column.clone(),
        unique_key: header.unique_key.clone(),
        tags: header.tags.clone(),
    };
    definition.validate()?;
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_body() {
        let contents = "-- ironlayer: {\"name\": \"orders_daily\", \"kind\": \"FULL_REFRESH\"}\nSELECT 1";
        let (header, body) = parse_file(contents).unwrap();
        assert_eq!(header.name, "orders_daily");
        assert_eq!(body.trim(), "SELECT 1");
    }

    #[test]
    fn missing_header_is_validation_error() {
        let err = parse_file("SELECT 1").unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }

    #[test]
    fn incremental_without_time_column_fails_validation() {
        let header = ModelHeader {
            name: "x".to_string(),
            kind: ModelKind::IncrementalByTimeRange,
            materialization: Materialization::Table,
            time_column: None,
            unique_key: None,
            tags: vec![],
            contracts: vec![],
            tests: vec![],
        };
        let result = build_definition(
            &header,
            "SELECT 1",
            "SELECT 1",
            SqlDialect::Redshift,
            &QualifyMap::new(),
        );
        assert!(result.is_err());
    }
}
