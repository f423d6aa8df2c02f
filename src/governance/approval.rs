use crate::error::{IronlayerError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Draft,
    AutoApproved,
    ManuallyApproved,
    Rejected,
    Applied,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub identity: String,
    pub comment: Option<String>,
}

/// A plan's approval lifecycle: `DRAFT -> (approve|reject)* -> (AUTO_APPROVED
/// | MANUALLY_APPROVED | REJECTED) -> APPLIED | CANCELLED` (spec.md §4.7).
/// Approvals and rejections always record the authenticated identity, never
/// a body-supplied name, and a given identity may not approve twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalState {
    pub status: PlanStatus,
    pub approvals: Vec<DecisionRecord>,
    pub rejections: Vec<DecisionRecord>,
}

impl ApprovalState {
    pub fn new() -> Self {
        Self {
            status: PlanStatus::Draft,
            approvals: Vec::new(),
            rejections: Vec::new(),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            PlanStatus::Rejected | PlanStatus::Applied | PlanStatus::Cancelled
        )
    }

    pub fn approve(&mut self, identity: &str, comment: Option<String>, auto: bool) -> Result<()> {
        if self.is_terminal() {
            return Err(IronlayerError::Conflict(format!(
                "plan is already in terminal state {:?}",
                self.status
            )));
        }
        if self.approvals.iter().any(|d| d.identity == identity) {
            return Err(IronlayerError::Conflict(format!(
                "identity '{identity}' has already approved this plan"
            )));
        }
        self.approvals.push(DecisionRecord {
            identity: identity.to_string(),
            comment,
        });
        self.status = if auto {
            PlanStatus::AutoApproved
        } else {
            PlanStatus::ManuallyApproved
        };
        Ok(())
    }

    pub fn reject(&mut self, identity: &str, reason: String) -> Result<()> {
        if self.is_terminal() {
            return Err(IronlayerError::Conflict(format!(
                "plan is already in terminal state {:?}",
                self.status
            )));
        }
        self.rejections.push(DecisionRecord {
            identity: identity.to_string(),
            comment: Some(reason),
        });
        self.status = PlanStatus::Rejected;
        Ok(())
    }

    pub fn apply(&mut self) -> Result<()> {
        if !matches!(self.status, PlanStatus::AutoApproved | PlanStatus::ManuallyApproved) {
            return Err(IronlayerError::Conflict(format!(
                "cannot apply a plan in state {:?}",
                self.status
            )));
        }
        self.status = PlanStatus::Applied;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        if self.is_terminal() {
            return Err(IronlayerError::Conflict(format!(
                "plan is already in terminal state {:?}",
                self.status
            )));
        }
        self.status = PlanStatus::Cancelled;
        Ok(())
    }
}

impl Default for ApprovalState {
    fn default() -> Self {
        Self::new()
    }
}
