//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the record/tree contracts.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cyclic parent reference at record: {id}")]
    CyclicReference { id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("duplicate record id: {id}")]
    DuplicateId { id: String },
}

impl DomainError {
    pub fn cyclic(id: impl std::fmt::Display) -> Self {
        Self::CyclicReference { id: id.to_string() }
    }

    pub fn duplicate(id: impl std::fmt::Display) -> Self {
        Self::DuplicateId { id: id.to_string() }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
