//! Append-only audit record of an inventory unit changing place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowage_core::{
    ContainerId, DomainError, DomainResult, Entity, InventoryId, LocationId, MovementId, TenantId,
    UserId,
};

/// One side of a movement. Both fields empty on the `from` side means the
/// unit was newly created.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub location_id: Option<LocationId>,
    pub container_id: Option<ContainerId>,
}

impl Placement {
    pub fn at(location_id: LocationId, container_id: Option<ContainerId>) -> Self {
        Self {
            location_id: Some(location_id),
            container_id,
        }
    }

    pub fn nowhere() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.location_id.is_none() && self.container_id.is_none()
    }
}

/// Input for [`Movement::record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub workspace_id: TenantId,
    pub inventory_id: InventoryId,
    pub from: Placement,
    pub to: Placement,
    pub quantity: i64,
    pub moved_by: Option<UserId>,
    pub reason: Option<String>,
}

/// Immutable movement record. There are no mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    id: MovementId,
    workspace_id: TenantId,
    inventory_id: InventoryId,
    from: Placement,
    to: Placement,
    quantity: i64,
    moved_by: Option<UserId>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl Movement {
    /// Build a record after checking it is structurally complete.
    pub fn record(new: NewMovement, now: DateTime<Utc>) -> DomainResult<Self> {
        let workspace_id = new.workspace_id.require("workspace_id")?;
        let inventory_id = new.inventory_id.require("inventory_id")?;
        if new.to.is_empty() {
            return Err(DomainError::validation("movement target is required"));
        }
        if new.quantity < 0 {
            return Err(DomainError::validation("moved quantity cannot be negative"));
        }

        Ok(Self {
            id: MovementId::new(),
            workspace_id,
            inventory_id,
            from: new.from,
            to: new.to,
            quantity: new.quantity,
            moved_by: new.moved_by,
            reason: new.reason,
            created_at: now,
        })
    }

    /// Rebuild a stored record without re-validating it.
    #[allow(clippy::too_many_arguments)]
    pub fn rehydrate(
        id: MovementId,
        workspace_id: TenantId,
        inventory_id: InventoryId,
        from: Placement,
        to: Placement,
        quantity: i64,
        moved_by: Option<UserId>,
        reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            workspace_id,
            inventory_id,
            from,
            to,
            quantity,
            moved_by,
            reason,
            created_at,
        }
    }

    pub fn workspace_id(&self) -> TenantId {
        self.workspace_id
    }

    pub fn inventory_id(&self) -> InventoryId {
        self.inventory_id
    }

    pub fn from(&self) -> Placement {
        self.from
    }

    pub fn to(&self) -> Placement {
        self.to
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn moved_by(&self) -> Option<UserId> {
        self.moved_by
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True for the record written when the unit was first placed.
    pub fn is_initial_placement(&self) -> bool {
        self.from.is_empty()
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.workspace_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_movement() -> NewMovement {
        NewMovement {
            workspace_id: TenantId::new(),
            inventory_id: InventoryId::new(),
            from: Placement::at(LocationId::new(), None),
            to: Placement::at(LocationId::new(), Some(ContainerId::new())),
            quantity: 5,
            moved_by: Some(UserId::new()),
            reason: Some("reshelving".to_string()),
        }
    }

    #[test]
    fn record_keeps_both_sides() {
        let input = new_movement();
        let movement = Movement::record(input.clone(), Utc::now()).unwrap();
        assert_eq!(movement.inventory_id(), input.inventory_id);
        assert_eq!(movement.from(), input.from);
        assert_eq!(movement.to(), input.to);
        assert_eq!(movement.quantity(), 5);
        assert_eq!(movement.reason(), Some("reshelving"));
        assert!(!movement.is_initial_placement());
    }

    #[test]
    fn record_requires_unit_reference() {
        let mut input = new_movement();
        input.inventory_id = InventoryId::nil();
        assert!(matches!(
            Movement::record(input, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn record_requires_a_target() {
        let mut input = new_movement();
        input.to = Placement::nowhere();
        assert!(matches!(
            Movement::record(input, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn empty_origin_marks_initial_placement() {
        let mut input = new_movement();
        input.from = Placement::nowhere();
        let movement = Movement::record(input, Utc::now()).unwrap();
        assert!(movement.is_initial_placement());
    }
}
