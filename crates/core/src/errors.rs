use thiserror::Error;

use crate::domain::employee::EmployeeId;
use crate::domain::expense::{ExpenseId, ExpenseStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid expense transition from {from:?} to {to:?}")]
    InvalidExpenseTransition { from: ExpenseStatus, to: ExpenseStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Rejected engine operations. None of these leave partial state behind.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("`{voter}` is not in the approval chain of expense `{expense_id}`")]
    UnauthorizedVoter { expense_id: ExpenseId, voter: EmployeeId },
    #[error("no approval chain can be derived for submitter `{submitter}`")]
    UnresolvedManager { submitter: EmployeeId },
    #[error("expense `{expense_id}` is already {status:?}")]
    AlreadyFinalized { expense_id: ExpenseId, status: ExpenseStatus },
    #[error("expense `{expense_id}` already exists")]
    DuplicateId { expense_id: ExpenseId },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ApprovalError {
    pub fn expense_not_found(id: &ExpenseId) -> Self {
        Self::NotFound { entity: "expense", id: id.0.clone() }
    }

    pub fn employee_not_found(id: &EmployeeId) -> Self {
        Self::NotFound { entity: "employee", id: id.0.clone() }
    }

    /// Stable snake_case class used in machine-readable output.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::UnauthorizedVoter { .. } => "unauthorized_voter",
            Self::UnresolvedManager { .. } => "unresolved_manager",
            Self::AlreadyFinalized { .. } => "already_finalized",
            Self::DuplicateId { .. } => "duplicate_id",
            Self::Domain(_) => "domain",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<DomainError> for ApplicationError {
    fn from(value: DomainError) -> Self {
        Self::Approval(ApprovalError::Domain(value))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "You are not an approver for this expense.",
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::Conflict { .. } => "The expense has already been decided or already exists.",
            Self::Internal { .. } => {
                "An internal error occurred. Check the service configuration."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Approval(error) => {
                let message = error.to_string();
                match error {
                    ApprovalError::Validation(_) | ApprovalError::UnresolvedManager { .. } => {
                        Self::BadRequest { message, correlation_id: unassigned() }
                    }
                    ApprovalError::UnauthorizedVoter { .. } => {
                        Self::Forbidden { message, correlation_id: unassigned() }
                    }
                    ApprovalError::NotFound { .. } => {
                        Self::NotFound { message, correlation_id: unassigned() }
                    }
                    ApprovalError::AlreadyFinalized { .. }
                    | ApprovalError::DuplicateId { .. }
                    | ApprovalError::Domain(_) => {
                        Self::Conflict { message, correlation_id: unassigned() }
                    }
                }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}
