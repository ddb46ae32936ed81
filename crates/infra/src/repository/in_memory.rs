//! In-memory repositories for tests/dev.
//!
//! Not optimized for performance: list queries scan the tenant's rows.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stowage_core::{
    BorrowerId, ContainerId, Entity, InventoryId, ItemId, LoanId, LocationId, TenantId,
};
use stowage_inventory::{InventoryUnit, Movement, Status};
use stowage_loans::{Borrower, Loan};

use super::tenant_table::TenantTable;
use super::{
    Admission, BorrowerRepository, InventoryRepository, LoanRepository, MovementRepository,
    RepositoryError, RepositoryResult,
};

fn oldest_first(mut units: Vec<InventoryUnit>) -> Vec<InventoryUnit> {
    units.sort_by_key(|u| (u.created_at(), *u.id()));
    units
}

fn newest_loans_first(mut loans: Vec<Loan>) -> Vec<Loan> {
    loans.sort_by(|a, b| b.loaned_at().cmp(&a.loaned_at()).then(b.id().cmp(a.id())));
    loans
}

#[derive(Debug, Default)]
pub struct InMemoryInventoryRepository {
    table: TenantTable<InventoryUnit>,
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn save(&self, unit: &InventoryUnit) -> RepositoryResult<()> {
        self.table.upsert(unit)
    }

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: InventoryId,
    ) -> RepositoryResult<Option<InventoryUnit>> {
        self.table.get(tenant_id, &id)
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        include_archived: bool,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.table
            .select(tenant_id, |u| include_archived || !u.is_archived())
            .map(oldest_first)
    }

    async fn find_by_item(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.table
            .select(tenant_id, |u| !u.is_archived() && u.item_id() == item_id)
            .map(oldest_first)
    }

    async fn find_by_location(
        &self,
        tenant_id: TenantId,
        location_id: LocationId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.table
            .select(tenant_id, |u| !u.is_archived() && u.location_id() == location_id)
            .map(oldest_first)
    }

    async fn find_by_container(
        &self,
        tenant_id: TenantId,
        container_id: ContainerId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.table
            .select(tenant_id, |u| {
                !u.is_archived() && u.container_id() == Some(container_id)
            })
            .map(oldest_first)
    }

    async fn find_available(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.table
            .select(tenant_id, |u| {
                !u.is_archived()
                    && u.item_id() == item_id
                    && u.status() == Status::Available
                    && u.quantity() > 0
            })
            .map(oldest_first)
    }

    async fn total_quantity(&self, tenant_id: TenantId, item_id: ItemId) -> RepositoryResult<i64> {
        let units = self
            .table
            .select(tenant_id, |u| !u.is_archived() && u.item_id() == item_id)?;
        units
            .iter()
            .try_fold(0i64, |total, u| total.checked_add(u.quantity()))
            .ok_or_else(|| RepositoryError::Storage("total quantity overflow".to_string()))
    }

    async fn delete(&self, tenant_id: TenantId, id: InventoryId) -> RepositoryResult<bool> {
        self.table.remove(tenant_id, &id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLoanRepository {
    table: TenantTable<Loan>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn save(&self, loan: &Loan) -> RepositoryResult<()> {
        self.table.upsert(loan)
    }

    async fn insert_within(&self, loan: &Loan, unit_quantity: i64) -> RepositoryResult<Admission> {
        // One write guard spans the sum and the insert.
        let mut rows = self.table.write()?;
        let on_loan: i64 = rows
            .values()
            .filter(|l| {
                l.tenant_id() == loan.tenant_id()
                    && l.inventory_id() == loan.inventory_id()
                    && l.is_active()
            })
            .map(Loan::quantity)
            .sum();

        let remaining = (unit_quantity - on_loan).max(0);
        if loan.quantity() > remaining {
            return Ok(Admission::Exceeded { remaining });
        }

        TenantTable::upsert_locked(&mut rows, loan)?;
        Ok(Admission::Admitted)
    }

    async fn find_by_id(&self, tenant_id: TenantId, id: LoanId) -> RepositoryResult<Option<Loan>> {
        self.table.get(tenant_id, &id)
    }

    async fn find_active_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Loan>> {
        self.table
            .select(tenant_id, |l| l.inventory_id() == inventory_id && l.is_active())
            .map(newest_loans_first)
    }

    async fn find_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Loan>> {
        self.table
            .select(tenant_id, |l| l.inventory_id() == inventory_id)
            .map(newest_loans_first)
    }

    async fn find_for_borrower(
        &self,
        tenant_id: TenantId,
        borrower_id: BorrowerId,
    ) -> RepositoryResult<Vec<Loan>> {
        self.table
            .select(tenant_id, |l| l.borrower_id() == borrower_id)
            .map(newest_loans_first)
    }

    async fn find_active(&self, tenant_id: TenantId) -> RepositoryResult<Vec<Loan>> {
        self.table
            .select(tenant_id, Loan::is_active)
            .map(newest_loans_first)
    }

    async fn find_overdue(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Loan>> {
        let mut loans = self.table.select(tenant_id, |l| l.is_overdue(now))?;
        loans.sort_by_key(|l| l.due_date());
        Ok(loans)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBorrowerRepository {
    table: TenantTable<Borrower>,
}

impl InMemoryBorrowerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BorrowerRepository for InMemoryBorrowerRepository {
    async fn save(&self, borrower: &Borrower) -> RepositoryResult<()> {
        self.table.upsert(borrower)
    }

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: BorrowerId,
    ) -> RepositoryResult<Option<Borrower>> {
        self.table.get(tenant_id, &id)
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        include_archived: bool,
    ) -> RepositoryResult<Vec<Borrower>> {
        let mut borrowers = self
            .table
            .select(tenant_id, |b| include_archived || !b.is_archived())?;
        borrowers.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(b.id())));
        Ok(borrowers)
    }
}

/// Append-only log; the position in the log is the tie-breaker for records
/// sharing a timestamp.
#[derive(Debug, Default)]
pub struct InMemoryMovementRepository {
    log: RwLock<Vec<Movement>>,
}

impl InMemoryMovementRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MovementRepository for InMemoryMovementRepository {
    async fn append(&self, movement: &Movement) -> RepositoryResult<()> {
        let mut log = self
            .log
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        log.push(movement.clone());
        Ok(())
    }

    async fn list_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Movement>> {
        let log = self
            .log
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        let mut history: Vec<(usize, Movement)> = log
            .iter()
            .enumerate()
            .filter(|(_, m)| m.tenant_id() == tenant_id && m.inventory_id() == inventory_id)
            .map(|(seq, m)| (seq, m.clone()))
            .collect();

        history.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at()
                .cmp(&a.created_at())
                .then(seq_b.cmp(seq_a))
        });
        Ok(history.into_iter().map(|(_, m)| m).collect())
    }
}
