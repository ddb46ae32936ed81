//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a failure, independent of the concrete error type.
///
/// Transports map these onto their own status codes; the core only promises
/// which kind a given failure belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The entity does not resolve within the caller's tenant.
    NotFound,
    /// Structural or field-level violation.
    InvalidInput,
    /// A structurally valid request violated a domain rule.
    BusinessRule,
    /// Persistence or infrastructure failure.
    Internal,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive quantity, empty reference).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found within the caller's tenant.
    #[error("not found")]
    NotFound,

    /// A loan was requested against a unit that is not `AVAILABLE`.
    #[error("inventory is not available for loan")]
    InventoryNotAvailable,

    /// The requested loan quantity exceeds what is left on the unit.
    #[error("requested quantity {requested} exceeds available quantity {remaining}")]
    QuantityExceedsAvailable { requested: i64, remaining: i64 },

    /// The loan has already been returned.
    #[error("loan has already been returned")]
    AlreadyReturned,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::InvalidInput,
            DomainError::NotFound => ErrorKind::NotFound,
            DomainError::InventoryNotAvailable
            | DomainError::QuantityExceedsAvailable { .. }
            | DomainError::AlreadyReturned => ErrorKind::BusinessRule,
        }
    }
}
