use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub url: String,
    pub event_types: BTreeSet<String>,
    pub secret_hash: String,
    pub active: bool,
}

impl Subscription {
    pub fn matches(&self, event_type: &str) -> bool {
        self.active && self.event_types.contains(event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_subscription_never_matches() {
        let sub = Subscription {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            url: "https://example.com/hook".to_string(),
            event_types: ["plan.approved".to_string()].into_iter().collect(),
            secret_hash: "h".to_string(),
            active: false,
        };
        assert!(!sub.matches("plan.approved"));
    }

    #[test]
    fn active_subscription_matches_only_declared_types() {
        let sub = Subscription {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            url: "https://example.com/hook".to_string(),
            event_types: ["plan.approved".to_string()].into_iter().collect(),
            secret_hash: "h".to_string(),
            active: true,
        };
        assert!(sub.matches("plan.approved"));
        assert!(!sub.matches("plan.rejected"));
    }
}
