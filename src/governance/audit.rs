use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tenant_id: Uuid,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub previous_hash: String,
    pub entry_hash: String,
}

/// Canonical byte representation fed into the hash chain. Field order is
/// fixed so the same logical entry always hashes the same way regardless
/// of how it was constructed (spec.md §4.7).
fn canonical_bytes(tenant_id: Uuid, actor: &str, action: &str, resource: &str, previous_hash: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(tenant_id.as_bytes());
    buf.push(0);
    buf.extend_from_slice(actor.as_bytes());
    buf.push(0);
    buf.extend_from_slice(action.as_bytes());
    buf.push(0);
    buf.extend_from_slice(resource.as_bytes());
    buf.push(0);
    buf.extend_from_slice(previous_hash.as_bytes());
    buf
}

/// Appends a new entry onto a chain whose current tip hash is
/// `previous_hash` (the genesis entry uses `GENESIS_HASH`).
pub fn append(tenant_id: Uuid, actor: &str, action: &str, resource: &str, previous_hash: &str) -> AuditEntry {
    let bytes = canonical_bytes(tenant_id, actor, action, resource, previous_hash);
    let entry_hash = hex::encode(Sha256::digest(&bytes));
    AuditEntry {
        tenant_id,
        actor: actor.to_string(),
        action: action.to_string(),
        resource: resource.to_string(),
        previous_hash: previous_hash.to_string(),
        entry_hash,
    }
}

/// Re-derives the chain in order; returns the index of the first entry
/// whose stored `entry_hash` doesn't match the recomputed value, or whose
/// `previous_hash` doesn't match its predecessor's `entry_hash`.
pub fn verify_chain(entries: &[AuditEntry]) -> Result<(), usize> {
    let mut expected_previous = GENESIS_HASH.to_string();
    for (i, entry) in entries.iter().enumerate() {
        if entry.previous_hash != expected_previous {
            return Err(i);
        }
        let bytes = canonical_bytes(entry.tenant_id, &entry.actor, &entry.action, &entry.resource, &entry.previous_hash);
        let recomputed = hex::encode(Sha256::digest(&bytes));
        if recomputed != entry.entry_hash {
            return Err(i);
        }
        expected_previous = entry.entry_hash.clone();
    }
    Ok(())
}
