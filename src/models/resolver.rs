use crate::error::{IronlayerError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\{\s*ref\(\s*['"]([^'"]+)['"]\s*\)\s*\}\}"#).unwrap());

#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub canonical_name: String,
    pub clean_sql: String,
}

/// Builds the short-name and fully-qualified-name registry for a model set
/// and substitutes every `{{ ref('name') }}` macro with the resolved
/// canonical table reference.
pub struct RefResolver {
    // short name ("orders_daily") -> canonical ("analytics.orders_daily")
    by_short_name: BTreeMap<String, String>,
    // fully-qualified name -> canonical (identity for this design, kept
    // distinct so both lookup kinds are explicit per spec.md §4.2)
    by_qualified_name: BTreeMap<String, String>,
}

impl RefResolver {
    pub fn new() -> Self {
        Self {
            by_short_name: BTreeMap::new(),
            by_qualified_name: BTreeMap::new(),
        }
    }

    /// Registers a canonical (schema-qualified) name, e.g.
    /// `analytics.orders_daily`, deriving its short name as the final
    /// dot-separated segment.
    pub fn register(&mut self, canonical_name: &str) {
        self.by_qualified_name
            .insert(canonical_name.to_string(), canonical_name.to_string());
        if let Some(short) = canonical_name.rsplit('.').next() {
            self.by_short_name
                .insert(short.to_string(), canonical_name.to_string());
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.by_qualified_name
            .get(name)
            .or_else(|| self.by_short_name.get(name))
            .map(|s| s.as_str())
    }

    /// Deterministic (sorted) list of every name this resolver knows,
    /// surfaced in `UnresolvedRef` errors.
    fn available_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_qualified_name
            .keys()
            .chain(self.by_short_name.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Substitute every `{{ ref('name') }}` macro in `body` with its
    /// resolved canonical table reference. Fails deterministically on the
    /// first unresolved reference encountered in source order.
    pub fn resolve(&self, body: &str) -> Result<String> {
        let mut result = String::with_capacity(body.len());
        let mut last_end = 0;
        for caps in REF_PATTERN.captures_iter(body) {
            let whole = caps.get(0).unwrap();
            let reference = caps.get(1).unwrap().as_str();
            let canonical = self.lookup(reference).ok_or_else(|| IronlayerError::UnresolvedRef {
                reference: reference.to_string(),
                available: self.available_names(),
            })?;
            result.push_str(&body[last_end..whole.start()]);
            result.push_str(canonical);
            last_end = whole.end();
        }
        result.push_str(&body[last_end..]);
        Ok(result)
    }
}

impl Default for RefResolver {
    fn default() -> Self {
        Self::new()
    }
}
