use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Flat role lattice: `Viewer < Operator < Engineer < Admin`. `Service` sits
/// outside the user lattice with its own narrower capability set
/// (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Viewer,
    Operator,
    Engineer,
    Admin,
    Service,
}

impl Role {
    /// The role directly beneath this one in the lattice, or `None` at the
    /// bottom (`Viewer`) or for `Service` (outside the lattice). Walking
    /// this chain is how `permits` resolves inherited capabilities, in the
    /// style of the teacher's `parent_roles` walk — kept to a single linear
    /// chain here since spec.md's lattice is flat, not a general DAG.
    fn parent(self) -> Option<Role> {
        match self {
            Role::Admin => Some(Role::Engineer),
            Role::Engineer => Some(Role::Operator),
            Role::Operator => Some(Role::Viewer),
            Role::Viewer | Role::Service => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    ViewPlans,
    ViewModels,
    ViewRuns,
    GeneratePlans,
    RunChecks,
    ApprovePlans,
    RejectPlans,
    ManageWebhooks,
    ManageTenantSettings,
    ManageUsers,
    ManageBilling,
    AdminAnalytics,
    AdminHealth,
    AdminReporting,
}

fn own_capabilities(role: Role) -> BTreeSet<Capability> {
    use Capability::*;
    match role {
        Role::Viewer => [ViewPlans, ViewModels, ViewRuns].into_iter().collect(),
        Role::Operator => [GeneratePlans, RunChecks].into_iter().collect(),
        Role::Engineer => [ApprovePlans, RejectPlans, ManageWebhooks].into_iter().collect(),
        Role::Admin => [ManageTenantSettings, ManageUsers, ManageBilling].into_iter().collect(),
        Role::Service => [ViewPlans, ViewModels, ViewRuns, GeneratePlans, RunChecks].into_iter().collect(),
    }
}

/// Resolves the full capability set for `role` by walking its inheritance
/// chain and unioning each ancestor's own capabilities.
pub fn resolved_capabilities(role: Role) -> BTreeSet<Capability> {
    let mut caps = own_capabilities(role);
    let mut current = role;
    while let Some(parent) = current.parent() {
        caps.extend(own_capabilities(parent));
        current = parent;
    }
    caps
}

pub fn permits(role: Role, capability: Capability) -> bool {
    resolved_capabilities(role).contains(&capability)
}

/// Admin-only analytics/health/reporting surface — a second endpoint
/// surface distinct from the authenticated-user operations above
/// (spec.md §4.7).
pub fn permits_admin_surface(role: Role, capability: Capability) -> bool {
    matches!(
        capability,
        Capability::AdminAnalytics | Capability::AdminHealth | Capability::AdminReporting
    ) && role == Role::Admin
}
