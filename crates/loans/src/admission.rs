//! Loan admission: the rule that decides whether a unit can be lent out.
//!
//! A `LoanAdmission` is assembled per operation from a freshly loaded unit,
//! the borrower and every loan recorded against that unit. Callers must hold
//! whatever serializes admissions for the unit (lock or transaction) from the
//! moment those copies are read until the new loan is persisted; otherwise two
//! admissions can both see the same remaining quantity.

use chrono::{DateTime, Utc};

use stowage_core::{DomainError, DomainResult, Entity};
use stowage_inventory::{InventoryUnit, Status};

use crate::borrower::Borrower;
use crate::loan::{Loan, NewLoan};

/// Quantity of `unit` currently out on active loans among `loans`.
pub fn on_loan(unit: &InventoryUnit, loans: &[Loan]) -> i64 {
    loans
        .iter()
        .filter(|l| l.inventory_id() == *unit.id() && l.is_active())
        .map(Loan::quantity)
        .sum()
}

/// Quantity of `unit` still free to lend, never negative.
pub fn remaining_quantity(unit: &InventoryUnit, loans: &[Loan]) -> i64 {
    (unit.quantity() - on_loan(unit, loans)).max(0)
}

#[derive(Debug)]
pub struct LoanAdmission<'a> {
    unit: &'a InventoryUnit,
    borrower: &'a Borrower,
    on_loan: i64,
}

impl<'a> LoanAdmission<'a> {
    /// Assemble the aggregate. `loans` may contain returned loans or loans for
    /// other units; only active loans against `unit` count.
    pub fn new(unit: &'a InventoryUnit, borrower: &'a Borrower, loans: &[Loan]) -> Self {
        Self {
            unit,
            borrower,
            on_loan: on_loan(unit, loans),
        }
    }

    /// Quantity currently out on active loans.
    pub fn on_loan(&self) -> i64 {
        self.on_loan
    }

    /// Quantity still free to lend.
    pub fn remaining(&self) -> i64 {
        (self.unit.quantity() - self.on_loan).max(0)
    }

    /// Check whether `requested` units may be lent.
    pub fn can_loan(&self, requested: i64) -> DomainResult<()> {
        if self.unit.status() != Status::Available {
            return Err(DomainError::InventoryNotAvailable);
        }
        let remaining = self.remaining();
        if requested > remaining {
            return Err(DomainError::QuantityExceedsAvailable {
                requested,
                remaining,
            });
        }
        Ok(())
    }

    /// Validate the request and open the loan.
    ///
    /// The unit's status is left alone: status tracks physical handling, while
    /// loan capacity is tracked by summed quantities.
    pub fn create_loan(&self, new: NewLoan, now: DateTime<Utc>) -> DomainResult<Loan> {
        new.validate()?;
        let workspace_id = new.workspace_id;

        if new.inventory_id != *self.unit.id() || self.unit.workspace_id() != workspace_id {
            return Err(DomainError::not_found());
        }
        if new.borrower_id != *self.borrower.id()
            || self.borrower.workspace_id() != workspace_id
            || self.borrower.is_archived()
        {
            return Err(DomainError::not_found());
        }

        self.can_loan(new.quantity)?;
        Ok(Loan::open(new, now))
    }
}
