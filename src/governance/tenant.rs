use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Set on every authenticated operation; tenant-scoped repositories (state
/// store §13) thread this through so every query carries the predicate
/// even where the underlying store also enforces row-level isolation
/// (defence in depth, spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: Uuid,
}

impl TenantContext {
    pub fn new(tenant_id: Uuid) -> Self {
        Self { tenant_id }
    }
}
