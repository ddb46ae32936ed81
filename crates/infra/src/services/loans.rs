//! Loan orchestration.
//!
//! Admission runs under the unit's lock: load unit, borrower and active loans,
//! apply [`LoanAdmission`], then insert through
//! [`LoanRepository::insert_within`], which repeats the remaining-quantity
//! check inside the store's own critical section. Either layer alone prevents
//! an oversold unit within one process. Stores that lock the unit row also
//! re-check its status, which covers several processes sharing one database.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::instrument;

use stowage_core::{BorrowerId, DomainError, Entity, InventoryId, LoanId};
use stowage_inventory::{InventoryUnit, NewMovement, Placement};
use stowage_loans::{Loan, LoanAdmission, LoanEvent, NewLoan, remaining_quantity};

use super::{ServiceResult, WorkspaceContext};
use crate::locks::UnitLocks;
use crate::movement_recorder::MovementRecorder;
use crate::publisher::EventPublisher;
use crate::repository::{Admission, BorrowerRepository, InventoryRepository, LoanRepository};

const LOANED_OUT: &str = "loaned out";
const LOAN_RETURNED: &str = "loan returned";

#[derive(Clone)]
pub struct LoanService {
    loans: Arc<dyn LoanRepository>,
    units: Arc<dyn InventoryRepository>,
    borrowers: Arc<dyn BorrowerRepository>,
    movements: MovementRecorder,
    publisher: EventPublisher,
    locks: Arc<UnitLocks>,
}

impl LoanService {
    pub fn new(
        loans: Arc<dyn LoanRepository>,
        units: Arc<dyn InventoryRepository>,
        borrowers: Arc<dyn BorrowerRepository>,
        movements: MovementRecorder,
        publisher: EventPublisher,
        locks: Arc<UnitLocks>,
    ) -> Self {
        Self {
            loans,
            units,
            borrowers,
            movements,
            publisher,
            locks,
        }
    }

    async fn load_unit(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
    ) -> ServiceResult<InventoryUnit> {
        self.units
            .find_by_id(ctx.tenant()?, id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    async fn load_loan(&self, ctx: &WorkspaceContext, id: LoanId) -> ServiceResult<Loan> {
        self.loans
            .find_by_id(ctx.tenant()?, id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    /// Lock the loan's unit, then re-read the loan under that lock.
    async fn load_loan_locked(
        &self,
        ctx: &WorkspaceContext,
        id: LoanId,
    ) -> ServiceResult<(OwnedMutexGuard<()>, Loan)> {
        let unit_id = self.load_loan(ctx, id).await?.inventory_id();
        let guard = self.locks.lock(unit_id).await;
        let loan = self.load_loan(ctx, id).await?;
        Ok((guard, loan))
    }

    /// Resolve the unit in the caller's tenant, lock it, then re-read it under
    /// that lock. Unknown ids never touch the lock table.
    async fn load_unit_locked(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
    ) -> ServiceResult<(OwnedMutexGuard<()>, InventoryUnit)> {
        self.load_unit(ctx, id).await?;
        let guard = self.locks.lock(id).await;
        let unit = self.load_unit(ctx, id).await?;
        Ok((guard, unit))
    }

    /// Audit-only movement: the unit stays where it is.
    async fn record_loan_movement(
        &self,
        ctx: &WorkspaceContext,
        unit: &InventoryUnit,
        loan: &Loan,
        reason: &str,
        now: DateTime<Utc>,
        operation: &'static str,
    ) {
        let here = Placement::at(unit.location_id(), unit.container_id());
        self.movements
            .record_best_effort(
                NewMovement {
                    workspace_id: loan.workspace_id(),
                    inventory_id: loan.inventory_id(),
                    from: here,
                    to: here,
                    quantity: loan.quantity(),
                    moved_by: ctx.actor_id,
                    reason: Some(reason.to_string()),
                },
                now,
                operation,
            )
            .await;
    }

    /// Lend `new.quantity` of a unit to a borrower.
    ///
    /// Fails with `NotFound` for an unknown unit or an unknown or archived
    /// borrower, `InventoryNotAvailable` unless the unit is `AVAILABLE`, and
    /// `QuantityExceedsAvailable` when active loans leave too little.
    #[instrument(
        skip(self, ctx, new),
        fields(
            tenant_id = %ctx.tenant_id,
            inventory_id = %new.inventory_id,
            borrower_id = %new.borrower_id,
            requested = new.quantity
        ),
        err
    )]
    pub async fn create_loan(&self, ctx: &WorkspaceContext, new: NewLoan) -> ServiceResult<Loan> {
        let new = NewLoan {
            workspace_id: ctx.tenant()?,
            ..new
        };
        new.validate()?;

        let (_guard, unit) = self.load_unit_locked(ctx, new.inventory_id).await?;
        let borrower = self
            .borrowers
            .find_by_id(new.workspace_id, new.borrower_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let active = self
            .loans
            .find_active_for_unit(new.workspace_id, *unit.id())
            .await?;

        let now = Utc::now();
        let loan = LoanAdmission::new(&unit, &borrower, &active).create_loan(new, now)?;

        match self.loans.insert_within(&loan, unit.quantity()).await? {
            Admission::Admitted => {}
            Admission::Exceeded { remaining } => {
                return Err(DomainError::QuantityExceedsAvailable {
                    requested: loan.quantity(),
                    remaining,
                }
                .into());
            }
            Admission::Unavailable => return Err(DomainError::InventoryNotAvailable.into()),
        }

        self.record_loan_movement(ctx, &unit, &loan, LOANED_OUT, now, "create_loan")
            .await;
        self.publisher.publish(&LoanEvent::created(&loan, ctx.actor_id));

        Ok(loan)
    }

    /// Mark a loan returned. A second return fails with `AlreadyReturned`.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, loan_id = %id), err)]
    pub async fn return_loan(&self, ctx: &WorkspaceContext, id: LoanId) -> ServiceResult<Loan> {
        let (_guard, mut loan) = self.load_loan_locked(ctx, id).await?;

        let now = Utc::now();
        loan.return_loan(now)?;
        self.loans.save(&loan).await?;

        match self.load_unit(ctx, loan.inventory_id()).await {
            Ok(unit) => {
                self.record_loan_movement(ctx, &unit, &loan, LOAN_RETURNED, now, "return_loan")
                    .await;
            }
            Err(error) => tracing::warn!(
                operation = "return_loan",
                inventory_id = %loan.inventory_id(),
                %error,
                "failed to load unit for return movement"
            ),
        }
        self.publisher
            .publish(&LoanEvent::returned(&loan, ctx.actor_id));

        Ok(loan)
    }

    /// Set a new due date on an active loan. Earlier dates are accepted.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, loan_id = %id), err)]
    pub async fn extend_due_date(
        &self,
        ctx: &WorkspaceContext,
        id: LoanId,
        due_date: DateTime<Utc>,
    ) -> ServiceResult<Loan> {
        let (_guard, mut loan) = self.load_loan_locked(ctx, id).await?;
        loan.extend_due_date(due_date, Utc::now())?;
        self.loans.save(&loan).await?;

        if let Some(event) = LoanEvent::due_date_extended(&loan, ctx.actor_id) {
            self.publisher.publish(&event);
        }
        Ok(loan)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, loan_id = %id), err)]
    pub async fn get(&self, ctx: &WorkspaceContext, id: LoanId) -> ServiceResult<Loan> {
        self.load_loan(ctx, id).await
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list_active(&self, ctx: &WorkspaceContext) -> ServiceResult<Vec<Loan>> {
        Ok(self.loans.find_active(ctx.tenant()?).await?)
    }

    /// Active loans whose due date is before `now`, earliest due first.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list_overdue(
        &self,
        ctx: &WorkspaceContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<Loan>> {
        Ok(self.loans.find_overdue(ctx.tenant()?, now).await?)
    }

    /// Every loan ever made against a unit, newest first.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %unit_id), err)]
    pub async fn list_for_unit(
        &self,
        ctx: &WorkspaceContext,
        unit_id: InventoryId,
    ) -> ServiceResult<Vec<Loan>> {
        let unit = self.load_unit(ctx, unit_id).await?;
        Ok(self.loans.find_for_unit(unit.workspace_id(), *unit.id()).await?)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, borrower_id = %borrower_id), err)]
    pub async fn list_for_borrower(
        &self,
        ctx: &WorkspaceContext,
        borrower_id: BorrowerId,
    ) -> ServiceResult<Vec<Loan>> {
        let tenant_id = ctx.tenant()?;
        if self.borrowers.find_by_id(tenant_id, borrower_id).await?.is_none() {
            return Err(DomainError::NotFound.into());
        }
        Ok(self.loans.find_for_borrower(tenant_id, borrower_id).await?)
    }

    /// Quantity of a unit not currently out on active loans.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %unit_id), err)]
    pub async fn remaining_quantity(
        &self,
        ctx: &WorkspaceContext,
        unit_id: InventoryId,
    ) -> ServiceResult<i64> {
        let unit = self.load_unit(ctx, unit_id).await?;
        let active = self
            .loans
            .find_active_for_unit(unit.workspace_id(), *unit.id())
            .await?;
        Ok(remaining_quantity(&unit, &active))
    }
}
