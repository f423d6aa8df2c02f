use super::normalize::NormalizeVersion;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// `hash(sql, version, metadata) -> sha256-hex`: digest of
/// `"ironlayer-canon-{version}:" ++ normalized_sql ++ sorted(metadata)`.
/// `normalized_sql` must already have been produced by `sql::normalize` at
/// the same version — the version prefix alone does not re-derive it, it
/// only guards against mixing hashes computed under different rule sets.
pub fn content_hash(
    normalized_sql: &str,
    version: NormalizeVersion,
    metadata: &BTreeMap<String, String>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("ironlayer-canon-{}:", version.as_str()).as_bytes());
    hasher.update(normalized_sql.as_bytes());
    for (k, v) in metadata {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}
