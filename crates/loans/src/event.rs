use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stowage_core::{BorrowerId, Entity, InventoryId, LoanId, TenantId, UserId};
use stowage_events::Event;

use crate::loan::Loan;

/// Event: LoanCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCreated {
    pub tenant_id: TenantId,
    pub loan_id: LoanId,
    pub inventory_id: InventoryId,
    pub borrower_id: BorrowerId,
    pub quantity: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReturned {
    pub tenant_id: TenantId,
    pub loan_id: LoanId,
    pub inventory_id: InventoryId,
    pub quantity: i64,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LoanDueDateExtended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDueDateExtended {
    pub tenant_id: TenantId,
    pub loan_id: LoanId,
    pub due_date: DateTime<Utc>,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanEvent {
    LoanCreated(LoanCreated),
    LoanReturned(LoanReturned),
    LoanDueDateExtended(LoanDueDateExtended),
}

impl LoanEvent {
    pub fn created(loan: &Loan, actor_id: Option<UserId>) -> Self {
        LoanEvent::LoanCreated(LoanCreated {
            tenant_id: loan.workspace_id(),
            loan_id: *loan.id(),
            inventory_id: loan.inventory_id(),
            borrower_id: loan.borrower_id(),
            quantity: loan.quantity(),
            due_date: loan.due_date(),
            actor_id,
            occurred_at: loan.loaned_at(),
        })
    }

    /// Build from a loan that has just been returned.
    pub fn returned(loan: &Loan, actor_id: Option<UserId>) -> Self {
        LoanEvent::LoanReturned(LoanReturned {
            tenant_id: loan.workspace_id(),
            loan_id: *loan.id(),
            inventory_id: loan.inventory_id(),
            quantity: loan.quantity(),
            actor_id,
            occurred_at: loan.returned_at().unwrap_or_else(|| loan.updated_at()),
        })
    }

    /// `None` when the loan carries no due date.
    pub fn due_date_extended(loan: &Loan, actor_id: Option<UserId>) -> Option<Self> {
        let due_date = loan.due_date()?;
        Some(LoanEvent::LoanDueDateExtended(LoanDueDateExtended {
            tenant_id: loan.workspace_id(),
            loan_id: *loan.id(),
            due_date,
            actor_id,
            occurred_at: loan.updated_at(),
        }))
    }

    pub fn loan_id(&self) -> LoanId {
        match self {
            LoanEvent::LoanCreated(e) => e.loan_id,
            LoanEvent::LoanReturned(e) => e.loan_id,
            LoanEvent::LoanDueDateExtended(e) => e.loan_id,
        }
    }
}

impl Event for LoanEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LoanEvent::LoanCreated(_) => "loans.loan.created",
            LoanEvent::LoanReturned(_) => "loans.loan.returned",
            LoanEvent::LoanDueDateExtended(_) => "loans.loan.due_date_extended",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LoanEvent::LoanCreated(e) => e.occurred_at,
            LoanEvent::LoanReturned(e) => e.occurred_at,
            LoanEvent::LoanDueDateExtended(e) => e.occurred_at,
        }
    }

    fn tenant_id(&self) -> TenantId {
        match self {
            LoanEvent::LoanCreated(e) => e.tenant_id,
            LoanEvent::LoanReturned(e) => e.tenant_id,
            LoanEvent::LoanDueDateExtended(e) => e.tenant_id,
        }
    }

    fn entity_type(&self) -> &'static str {
        "loan"
    }

    fn entity_id(&self) -> Uuid {
        *self.loan_id().as_uuid()
    }

    fn actor_id(&self) -> Option<UserId> {
        match self {
            LoanEvent::LoanCreated(e) => e.actor_id,
            LoanEvent::LoanReturned(e) => e.actor_id,
            LoanEvent::LoanDueDateExtended(e) => e.actor_id,
        }
    }
}
