//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are opaque UUIDs minted by their owning domain. The nil UUID
//! stands in for "empty" and is rejected wherever a reference is required.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The nil identifier, treated as "absent".
            pub fn nil() -> Self {
                Self(Uuid::nil())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Reject the nil identifier with a validation error naming `field`.
            pub fn require(self, field: &str) -> Result<Self, DomainError> {
                if self.is_nil() {
                    Err(DomainError::validation(format!("{field} is required")))
                } else {
                    Ok(self)
                }
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a tenant (workspace; the multi-tenant boundary).
    TenantId,
    "TenantId"
);
uuid_newtype!(
    /// Identifier of a user (actor identity).
    UserId,
    "UserId"
);
uuid_newtype!(
    /// Identifier of an inventory unit.
    InventoryId,
    "InventoryId"
);
uuid_newtype!(
    /// Identifier of a catalog item.
    ItemId,
    "ItemId"
);
uuid_newtype!(
    /// Identifier of a location.
    LocationId,
    "LocationId"
);
uuid_newtype!(
    /// Identifier of a container within a location.
    ContainerId,
    "ContainerId"
);
uuid_newtype!(
    /// Identifier of a borrower.
    BorrowerId,
    "BorrowerId"
);
uuid_newtype!(
    /// Identifier of a loan.
    LoanId,
    "LoanId"
);
uuid_newtype!(
    /// Identifier of a movement record.
    MovementId,
    "MovementId"
);
