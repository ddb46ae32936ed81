//! Application services.
//!
//! Each service method runs one operation end to end: tenant-scoped load,
//! domain rule, persistence, then best-effort side effects (movement audit
//! records and domain events). Side effects run after the primary write and
//! their failures are logged, never returned.

pub mod borrowers;
pub mod inventory;
pub mod loans;

use thiserror::Error;

use stowage_core::{DomainError, ErrorKind, TenantId, UserId};

use crate::repository::RepositoryError;

pub use borrowers::BorrowerService;
pub use inventory::{InventoryService, MoveRequest};
pub use loans::LoanService;

#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Domain(e) => e.kind(),
            ServiceError::Repository(_) => ErrorKind::Internal,
        }
    }

    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Repository(_) => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Who is calling, and on behalf of which workspace.
///
/// Every service call is scoped to `tenant_id`; `actor_id` is stamped on
/// movement records and events.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    pub tenant_id: TenantId,
    pub actor_id: Option<UserId>,
}

impl WorkspaceContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            actor_id: None,
        }
    }

    pub fn with_actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Reject a nil workspace id before touching storage.
    pub(crate) fn tenant(&self) -> ServiceResult<TenantId> {
        Ok(self.tenant_id.require("workspace_id")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_failures_are_internal() {
        let err = ServiceError::from(RepositoryError::Unavailable("down".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.as_domain().is_none());
    }

    #[test]
    fn domain_errors_keep_their_kind() {
        let err = ServiceError::from(DomainError::AlreadyReturned);
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(err.to_string(), "loan has already been returned");
    }

    #[test]
    fn nil_workspace_is_invalid_input() {
        let ctx = WorkspaceContext::new(TenantId::nil());
        assert_eq!(ctx.tenant().unwrap_err().kind(), ErrorKind::InvalidInput);
    }
}
