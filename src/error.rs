use thiserror::Error;

/// Crate-wide error type. One variant per failure kind named in the
/// governance/planning error taxonomy; collaborators map these to their own
/// transport-level status codes (HTTP, gRPC, ...) since transport is not
/// this crate's concern.
#[derive(Error, Debug)]
pub enum IronlayerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unresolved ref '{reference}': available names are {available:?}")]
    UnresolvedRef {
        reference: String,
        available: Vec<String>,
    },

    #[error("SQL parse error: {0}")]
    ParseError(String),

    #[error("dependency cycle detected: {0}")]
    DagCycle(String),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("budget exceeded: {period} period")]
    BudgetExceeded { period: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("CSRF validation failed")]
    Csrf,

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("collaborator timed out: {0}")]
    CollaboratorTimeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl IronlayerError {
    /// Semantic error-kind tag, stable across refactors, for collaborators
    /// that need to pick a transport status without matching on the Display
    /// string.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnresolvedRef { .. } => "UNRESOLVED_REF",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::DagCycle(_) => "DAG_CYCLE",
            Self::ContractViolation(_) => "CONTRACT_VIOLATION",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            Self::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Csrf => "CSRF_ERROR",
            Self::Integrity(_) => "INTEGRITY_ERROR",
            Self::CollaboratorUnavailable(_) => "COLLABORATOR_UNAVAILABLE",
            Self::CollaboratorTimeout(_) => "COLLABORATOR_TIMEOUT",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Unexpected(_) => "UNEXPECTED_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, IronlayerError>;
