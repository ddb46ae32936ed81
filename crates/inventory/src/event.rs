use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stowage_core::{
    ContainerId, Entity, InventoryId, ItemId, LocationId, TenantId, UserId,
};
use stowage_events::Event;

use crate::condition::{Condition, Status};
use crate::unit::{InventoryUnit, UnitDetails};

/// Event: UnitCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCreated {
    pub tenant_id: TenantId,
    pub inventory_id: InventoryId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub container_id: Option<ContainerId>,
    pub quantity: i64,
    pub condition: Condition,
    pub status: Status,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitUpdated {
    pub tenant_id: TenantId,
    pub inventory_id: InventoryId,
    pub location_id: LocationId,
    pub container_id: Option<ContainerId>,
    pub quantity: i64,
    pub condition: Condition,
    pub details: UnitDetails,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitMoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMoved {
    pub tenant_id: TenantId,
    pub inventory_id: InventoryId,
    pub from_location_id: LocationId,
    pub from_container_id: Option<ContainerId>,
    pub to_location_id: LocationId,
    pub to_container_id: Option<ContainerId>,
    pub quantity: i64,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatusChanged {
    pub tenant_id: TenantId,
    pub inventory_id: InventoryId,
    pub status: Status,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitQuantityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitQuantityChanged {
    pub tenant_id: TenantId,
    pub inventory_id: InventoryId,
    pub quantity: i64,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitArchived {
    pub tenant_id: TenantId,
    pub inventory_id: InventoryId,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitRestored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRestored {
    pub tenant_id: TenantId,
    pub inventory_id: InventoryId,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    UnitCreated(UnitCreated),
    UnitUpdated(UnitUpdated),
    UnitMoved(UnitMoved),
    UnitStatusChanged(UnitStatusChanged),
    UnitQuantityChanged(UnitQuantityChanged),
    UnitArchived(UnitArchived),
    UnitRestored(UnitRestored),
}

impl InventoryEvent {
    pub fn created(unit: &InventoryUnit, actor_id: Option<UserId>) -> Self {
        InventoryEvent::UnitCreated(UnitCreated {
            tenant_id: unit.workspace_id(),
            inventory_id: *unit.id(),
            item_id: unit.item_id(),
            location_id: unit.location_id(),
            container_id: unit.container_id(),
            quantity: unit.quantity(),
            condition: unit.condition(),
            status: unit.status(),
            actor_id,
            occurred_at: unit.updated_at(),
        })
    }

    pub fn updated(unit: &InventoryUnit, actor_id: Option<UserId>) -> Self {
        InventoryEvent::UnitUpdated(UnitUpdated {
            tenant_id: unit.workspace_id(),
            inventory_id: *unit.id(),
            location_id: unit.location_id(),
            container_id: unit.container_id(),
            quantity: unit.quantity(),
            condition: unit.condition(),
            details: unit.details().clone(),
            actor_id,
            occurred_at: unit.updated_at(),
        })
    }

    pub fn moved(
        unit: &InventoryUnit,
        from_location_id: LocationId,
        from_container_id: Option<ContainerId>,
        actor_id: Option<UserId>,
    ) -> Self {
        InventoryEvent::UnitMoved(UnitMoved {
            tenant_id: unit.workspace_id(),
            inventory_id: *unit.id(),
            from_location_id,
            from_container_id,
            to_location_id: unit.location_id(),
            to_container_id: unit.container_id(),
            quantity: unit.quantity(),
            actor_id,
            occurred_at: unit.updated_at(),
        })
    }

    pub fn status_changed(unit: &InventoryUnit, actor_id: Option<UserId>) -> Self {
        InventoryEvent::UnitStatusChanged(UnitStatusChanged {
            tenant_id: unit.workspace_id(),
            inventory_id: *unit.id(),
            status: unit.status(),
            actor_id,
            occurred_at: unit.updated_at(),
        })
    }

    pub fn quantity_changed(unit: &InventoryUnit, actor_id: Option<UserId>) -> Self {
        InventoryEvent::UnitQuantityChanged(UnitQuantityChanged {
            tenant_id: unit.workspace_id(),
            inventory_id: *unit.id(),
            quantity: unit.quantity(),
            actor_id,
            occurred_at: unit.updated_at(),
        })
    }

    pub fn archived(unit: &InventoryUnit, actor_id: Option<UserId>) -> Self {
        InventoryEvent::UnitArchived(UnitArchived {
            tenant_id: unit.workspace_id(),
            inventory_id: *unit.id(),
            actor_id,
            occurred_at: unit.updated_at(),
        })
    }

    pub fn restored(unit: &InventoryUnit, actor_id: Option<UserId>) -> Self {
        InventoryEvent::UnitRestored(UnitRestored {
            tenant_id: unit.workspace_id(),
            inventory_id: *unit.id(),
            actor_id,
            occurred_at: unit.updated_at(),
        })
    }

    pub fn inventory_id(&self) -> InventoryId {
        match self {
            InventoryEvent::UnitCreated(e) => e.inventory_id,
            InventoryEvent::UnitUpdated(e) => e.inventory_id,
            InventoryEvent::UnitMoved(e) => e.inventory_id,
            InventoryEvent::UnitStatusChanged(e) => e.inventory_id,
            InventoryEvent::UnitQuantityChanged(e) => e.inventory_id,
            InventoryEvent::UnitArchived(e) => e.inventory_id,
            InventoryEvent::UnitRestored(e) => e.inventory_id,
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::UnitCreated(_) => "inventory.unit.created",
            InventoryEvent::UnitUpdated(_) => "inventory.unit.updated",
            InventoryEvent::UnitMoved(_) => "inventory.unit.moved",
            InventoryEvent::UnitStatusChanged(_) => "inventory.unit.status_changed",
            InventoryEvent::UnitQuantityChanged(_) => "inventory.unit.quantity_changed",
            InventoryEvent::UnitArchived(_) => "inventory.unit.archived",
            InventoryEvent::UnitRestored(_) => "inventory.unit.restored",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::UnitCreated(e) => e.occurred_at,
            InventoryEvent::UnitUpdated(e) => e.occurred_at,
            InventoryEvent::UnitMoved(e) => e.occurred_at,
            InventoryEvent::UnitStatusChanged(e) => e.occurred_at,
            InventoryEvent::UnitQuantityChanged(e) => e.occurred_at,
            InventoryEvent::UnitArchived(e) => e.occurred_at,
            InventoryEvent::UnitRestored(e) => e.occurred_at,
        }
    }

    fn tenant_id(&self) -> TenantId {
        match self {
            InventoryEvent::UnitCreated(e) => e.tenant_id,
            InventoryEvent::UnitUpdated(e) => e.tenant_id,
            InventoryEvent::UnitMoved(e) => e.tenant_id,
            InventoryEvent::UnitStatusChanged(e) => e.tenant_id,
            InventoryEvent::UnitQuantityChanged(e) => e.tenant_id,
            InventoryEvent::UnitArchived(e) => e.tenant_id,
            InventoryEvent::UnitRestored(e) => e.tenant_id,
        }
    }

    fn entity_type(&self) -> &'static str {
        "inventory"
    }

    fn entity_id(&self) -> Uuid {
        *self.inventory_id().as_uuid()
    }

    fn actor_id(&self) -> Option<UserId> {
        match self {
            InventoryEvent::UnitCreated(e) => e.actor_id,
            InventoryEvent::UnitUpdated(e) => e.actor_id,
            InventoryEvent::UnitMoved(e) => e.actor_id,
            InventoryEvent::UnitStatusChanged(e) => e.actor_id,
            InventoryEvent::UnitQuantityChanged(e) => e.actor_id,
            InventoryEvent::UnitArchived(e) => e.actor_id,
            InventoryEvent::UnitRestored(e) => e.actor_id,
        }
    }
}
