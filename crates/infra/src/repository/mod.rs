//! Persistence ports.
//!
//! Every read and write is scoped by a workspace (tenant) id. A record that
//! exists under another tenant is indistinguishable from one that does not
//! exist at all: lookups return `Ok(None)`.
//!
//! Two families of adapters implement these traits:
//! - [`in_memory`]: `RwLock`-guarded maps for tests/dev
//! - [`postgres`]: `sqlx` against the schema in `migrations/`

pub mod in_memory;
pub mod postgres;
pub mod tenant_table;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stowage_core::{
    BorrowerId, ContainerId, InventoryId, ItemId, LoanId, LocationId, TenantId,
};
use stowage_inventory::{InventoryUnit, Movement};
use stowage_loans::{Borrower, Loan};

pub use in_memory::{
    InMemoryBorrowerRepository, InMemoryInventoryRepository, InMemoryLoanRepository,
    InMemoryMovementRepository,
};
pub use postgres::{
    PostgresBorrowerRepository, PostgresInventoryRepository, PostgresLoanRepository,
    PostgresMovementRepository, PostgresSchema,
};

/// Storage-level failure. Always surfaces to callers as an internal error.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// The backing store rejected or failed the operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// The backing store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt record: {0}")]
    Serialization(String),

    /// A write targeted a record owned by another tenant.
    #[error("tenant isolation violation")]
    TenantIsolation,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Outcome of an atomic "check remaining quantity, then insert" loan write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Exceeded { remaining: i64 },
    /// The unit's stored status was not `AVAILABLE` when re-read under lock.
    Unavailable,
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Insert or fully replace a unit. The last writer wins.
    async fn save(&self, unit: &InventoryUnit) -> RepositoryResult<()>;

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: InventoryId,
    ) -> RepositoryResult<Option<InventoryUnit>>;

    /// All units of the tenant; archived ones only when asked for.
    async fn list(
        &self,
        tenant_id: TenantId,
        include_archived: bool,
    ) -> RepositoryResult<Vec<InventoryUnit>>;

    /// Non-archived units of one catalog item.
    async fn find_by_item(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> RepositoryResult<Vec<InventoryUnit>>;

    /// Non-archived units placed at a location.
    async fn find_by_location(
        &self,
        tenant_id: TenantId,
        location_id: LocationId,
    ) -> RepositoryResult<Vec<InventoryUnit>>;

    /// Non-archived units placed in a container.
    async fn find_by_container(
        &self,
        tenant_id: TenantId,
        container_id: ContainerId,
    ) -> RepositoryResult<Vec<InventoryUnit>>;

    /// Non-archived, `AVAILABLE` units of an item with a positive quantity.
    async fn find_available(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> RepositoryResult<Vec<InventoryUnit>>;

    /// Sum of quantities over the item's non-archived units.
    async fn total_quantity(&self, tenant_id: TenantId, item_id: ItemId) -> RepositoryResult<i64>;

    /// Physically remove a unit. Returns whether anything was removed.
    ///
    /// Adapters that enforce references (Postgres) refuse to remove a unit
    /// that any loan, active or returned, points at and report `Storage`.
    /// The in-memory adapter keeps loans in a separate table and does not
    /// check. No service operation deletes units.
    async fn delete(&self, tenant_id: TenantId, id: InventoryId) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Insert or fully replace a loan.
    async fn save(&self, loan: &Loan) -> RepositoryResult<()>;

    /// Insert a new loan only if the unit still has room for it.
    ///
    /// The sum of active loans and the insert happen in one critical section
    /// (or transaction). `unit_quantity` is the quantity the caller loaded;
    /// adapters that can lock the unit row re-read quantity and status there
    /// instead and may answer [`Admission::Unavailable`]. Adapters that cannot
    /// see the unit rely on the caller holding its `UnitLocks` entry.
    async fn insert_within(&self, loan: &Loan, unit_quantity: i64) -> RepositoryResult<Admission>;

    async fn find_by_id(&self, tenant_id: TenantId, id: LoanId) -> RepositoryResult<Option<Loan>>;

    async fn find_active_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Loan>>;

    /// Every loan ever made against a unit, newest first.
    async fn find_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Loan>>;

    /// Every loan a borrower holds or held, newest first.
    async fn find_for_borrower(
        &self,
        tenant_id: TenantId,
        borrower_id: BorrowerId,
    ) -> RepositoryResult<Vec<Loan>>;

    async fn find_active(&self, tenant_id: TenantId) -> RepositoryResult<Vec<Loan>>;

    /// Active loans whose due date lies before `now`.
    async fn find_overdue(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Loan>>;
}

#[async_trait]
pub trait BorrowerRepository: Send + Sync {
    async fn save(&self, borrower: &Borrower) -> RepositoryResult<()>;

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: BorrowerId,
    ) -> RepositoryResult<Option<Borrower>>;

    async fn list(
        &self,
        tenant_id: TenantId,
        include_archived: bool,
    ) -> RepositoryResult<Vec<Borrower>>;
}

#[async_trait]
pub trait MovementRepository: Send + Sync {
    /// Append one immutable record.
    async fn append(&self, movement: &Movement) -> RepositoryResult<()>;

    /// Records for one unit, newest first; ties keep reverse append order.
    async fn list_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Movement>>;
}
