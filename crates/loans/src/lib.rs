//! Loan domain module.
//!
//! Borrowers, loans, and the admission rule that decides whether a quantity
//! of an inventory unit may be lent out. Pure domain logic: the aggregate is
//! assembled per operation from freshly loaded copies of the unit, the
//! borrower and the unit's active loans.

pub mod admission;
pub mod borrower;
pub mod event;
pub mod loan;

pub use admission::{LoanAdmission, on_loan, remaining_quantity};
pub use borrower::{Borrower, BorrowerParts, BorrowerUpdate, NewBorrower};
pub use event::{LoanCreated, LoanDueDateExtended, LoanEvent, LoanReturned};
pub use loan::{Loan, LoanParts, LoanState, NewLoan};
