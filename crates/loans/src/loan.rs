use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowage_core::{
    BorrowerId, DomainError, DomainResult, Entity, InventoryId, LoanId, TenantId,
};

/// Request to lend a quantity of one inventory unit to one borrower.
///
/// Loans are only built through [`LoanAdmission`](crate::LoanAdmission), which
/// checks availability first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLoan {
    pub workspace_id: TenantId,
    pub inventory_id: InventoryId,
    pub borrower_id: BorrowerId,
    pub quantity: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewLoan {
    /// Field-level checks that need no stored state.
    pub fn validate(&self) -> DomainResult<()> {
        self.workspace_id.require("workspace_id")?;
        self.inventory_id.require("inventory_id")?;
        self.borrower_id.require("borrower_id")?;
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        Ok(())
    }
}

/// Derived lifecycle state. Never stored; computed from the timestamps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanState {
    Active,
    Overdue,
    Returned,
}

/// Raw field set used by storage adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanParts {
    pub id: LoanId,
    pub workspace_id: TenantId,
    pub inventory_id: InventoryId,
    pub borrower_id: BorrowerId,
    pub quantity: i64,
    pub loaned_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    id: LoanId,
    workspace_id: TenantId,
    inventory_id: InventoryId,
    borrower_id: BorrowerId,
    quantity: i64,
    loaned_at: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Loan {
    pub(crate) fn open(new: NewLoan, now: DateTime<Utc>) -> Self {
        Self {
            id: LoanId::new(),
            workspace_id: new.workspace_id,
            inventory_id: new.inventory_id,
            borrower_id: new.borrower_id,
            quantity: new.quantity,
            loaned_at: now,
            due_date: new.due_date,
            returned_at: None,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rehydrate(parts: LoanParts) -> Self {
        Self {
            id: parts.id,
            workspace_id: parts.workspace_id,
            inventory_id: parts.inventory_id,
            borrower_id: parts.borrower_id,
            quantity: parts.quantity,
            loaned_at: parts.loaned_at,
            due_date: parts.due_date,
            returned_at: parts.returned_at,
            notes: parts.notes,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn workspace_id(&self) -> TenantId {
        self.workspace_id
    }

    pub fn inventory_id(&self) -> InventoryId {
        self.inventory_id
    }

    pub fn borrower_id(&self) -> BorrowerId {
        self.borrower_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn loaned_at(&self) -> DateTime<Utc> {
        self.loaned_at
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Active, with a due date strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_date.is_some_and(|due| due < now)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> LoanState {
        if self.is_returned() {
            LoanState::Returned
        } else if self.is_overdue(now) {
            LoanState::Overdue
        } else {
            LoanState::Active
        }
    }

    /// Mark the loan returned. A second call fails with `AlreadyReturned`.
    pub fn return_loan(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.is_returned() {
            return Err(DomainError::AlreadyReturned);
        }
        self.returned_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Move the due date while the loan is active.
    ///
    /// The new date may be earlier than the old one.
    pub fn extend_due_date(
        &mut self,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.is_returned() {
            return Err(DomainError::AlreadyReturned);
        }
        self.due_date = Some(due_date);
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Loan {
    type Id = LoanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.workspace_id
    }
}
