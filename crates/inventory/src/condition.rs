//! Closed enumerations for the physical condition and handling status of a unit.
//!
//! Membership is validated once, when a string crosses into the domain
//! (`FromStr`); past that point the type system carries the guarantee.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stowage_core::DomainError;

/// Physical condition of the units in a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    New,
    Excellent,
    Good,
    Fair,
    Poor,
    Damaged,
    ForRepair,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Condition::New,
        Condition::Excellent,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
        Condition::Damaged,
        Condition::ForRepair,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "NEW",
            Condition::Excellent => "EXCELLENT",
            Condition::Good => "GOOD",
            Condition::Fair => "FAIR",
            Condition::Poor => "POOR",
            Condition::Damaged => "DAMAGED",
            Condition::ForRepair => "FOR_REPAIR",
        }
    }
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("invalid condition: {s}")))
    }
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handling status of a unit.
///
/// Transitions between statuses are unrestricted. Loan admission is the only
/// rule that looks at the status (it requires `Available`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Available,
    InUse,
    Reserved,
    OnLoan,
    InTransit,
    Disposed,
    Missing,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Available,
        Status::InUse,
        Status::Reserved,
        Status::OnLoan,
        Status::InTransit,
        Status::Disposed,
        Status::Missing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Available => "AVAILABLE",
            Status::InUse => "IN_USE",
            Status::Reserved => "RESERVED",
            Status::OnLoan => "ON_LOAN",
            Status::InTransit => "IN_TRANSIT",
            Status::Disposed => "DISPOSED",
            Status::Missing => "MISSING",
        }
    }
}

impl FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("invalid status: {s}")))
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
