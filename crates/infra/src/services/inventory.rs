use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::instrument;

use stowage_core::{ContainerId, DomainError, Entity, InventoryId, ItemId, LocationId};
use stowage_inventory::{
    InventoryEvent, InventoryUnit, InventoryUpdate, Movement, NewInventoryUnit, NewMovement,
    Placement, Status,
};

use super::{ServiceResult, WorkspaceContext};
use crate::locks::UnitLocks;
use crate::movement_recorder::MovementRecorder;
use crate::publisher::EventPublisher;
use crate::repository::InventoryRepository;

/// Target placement for [`InventoryService::move_unit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub location_id: LocationId,
    pub container_id: Option<ContainerId>,
    /// Free text stored on the movement record.
    pub reason: Option<String>,
}

/// Inventory unit orchestration: load, apply the entity rule, persist, then
/// record movements and publish events on a best-effort basis.
#[derive(Clone)]
pub struct InventoryService {
    units: Arc<dyn InventoryRepository>,
    movements: MovementRecorder,
    publisher: EventPublisher,
    locks: Arc<UnitLocks>,
}

impl InventoryService {
    pub fn new(
        units: Arc<dyn InventoryRepository>,
        movements: MovementRecorder,
        publisher: EventPublisher,
        locks: Arc<UnitLocks>,
    ) -> Self {
        Self {
            units,
            movements,
            publisher,
            locks,
        }
    }

    async fn load(&self, ctx: &WorkspaceContext, id: InventoryId) -> ServiceResult<InventoryUnit> {
        let tenant_id = ctx.tenant()?;
        self.units
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    /// Load a unit while holding its lock. Keep the guard until the write
    /// and its side effects are done.
    async fn load_locked(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
    ) -> ServiceResult<(OwnedMutexGuard<()>, InventoryUnit)> {
        let guard = self.locks.lock(id).await;
        let unit = self.load(ctx, id).await?;
        Ok((guard, unit))
    }

    /// Create a unit in the caller's workspace and record its initial placement.
    #[instrument(skip(self, ctx, new), fields(tenant_id = %ctx.tenant_id, inventory_id = tracing::field::Empty), err)]
    pub async fn create(
        &self,
        ctx: &WorkspaceContext,
        new: NewInventoryUnit,
    ) -> ServiceResult<InventoryUnit> {
        let new = NewInventoryUnit {
            workspace_id: ctx.tenant()?,
            ..new
        };
        let now = Utc::now();
        let unit = InventoryUnit::create(new, now)?;
        tracing::Span::current().record("inventory_id", tracing::field::display(unit.id()));

        self.units.save(&unit).await?;

        self.movements
            .record_best_effort(
                NewMovement {
                    workspace_id: unit.workspace_id(),
                    inventory_id: *unit.id(),
                    from: Placement::nowhere(),
                    to: Placement::at(unit.location_id(), unit.container_id()),
                    quantity: unit.quantity(),
                    moved_by: ctx.actor_id,
                    reason: None,
                },
                now,
                "create_unit",
            )
            .await;
        self.publisher
            .publish(&InventoryEvent::created(&unit, ctx.actor_id));

        Ok(unit)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn get(&self, ctx: &WorkspaceContext, id: InventoryId) -> ServiceResult<InventoryUnit> {
        self.load(ctx, id).await
    }

    /// Replace placement, quantity, condition and metadata.
    ///
    /// A placement change appends an old → new movement record, best-effort.
    #[instrument(skip(self, ctx, update), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn update(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
        update: InventoryUpdate,
    ) -> ServiceResult<InventoryUnit> {
        let (_guard, mut unit) = self.load_locked(ctx, id).await?;
        let from = Placement::at(unit.location_id(), unit.container_id());

        let now = Utc::now();
        unit.update(update, now)?;
        self.units.save(&unit).await?;

        let to = Placement::at(unit.location_id(), unit.container_id());
        if to != from {
            self.movements
                .record_best_effort(
                    NewMovement {
                        workspace_id: unit.workspace_id(),
                        inventory_id: *unit.id(),
                        from,
                        to,
                        quantity: unit.quantity(),
                        moved_by: ctx.actor_id,
                        reason: None,
                    },
                    now,
                    "update_unit",
                )
                .await;
        }
        self.publisher
            .publish(&InventoryEvent::updated(&unit, ctx.actor_id));
        Ok(unit)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn update_status(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
        status: Status,
    ) -> ServiceResult<InventoryUnit> {
        let (_guard, mut unit) = self.load_locked(ctx, id).await?;
        unit.update_status(status, Utc::now());
        self.units.save(&unit).await?;
        self.publisher
            .publish(&InventoryEvent::status_changed(&unit, ctx.actor_id));
        Ok(unit)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn update_quantity(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
        quantity: i64,
    ) -> ServiceResult<InventoryUnit> {
        let (_guard, mut unit) = self.load_locked(ctx, id).await?;
        unit.update_quantity(quantity, Utc::now())?;
        self.units.save(&unit).await?;
        self.publisher
            .publish(&InventoryEvent::quantity_changed(&unit, ctx.actor_id));
        Ok(unit)
    }

    /// Relocate a unit and append an old → new movement record.
    ///
    /// The move stands even if the movement record cannot be written.
    #[instrument(skip(self, ctx, request), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn move_unit(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
        request: MoveRequest,
    ) -> ServiceResult<InventoryUnit> {
        let (_guard, mut unit) = self.load_locked(ctx, id).await?;
        let from_location = unit.location_id();
        let from_container = unit.container_id();

        let now = Utc::now();
        unit.move_to(request.location_id, request.container_id, now)?;
        self.units.save(&unit).await?;

        self.movements
            .record_best_effort(
                NewMovement {
                    workspace_id: unit.workspace_id(),
                    inventory_id: *unit.id(),
                    from: Placement::at(from_location, from_container),
                    to: Placement::at(unit.location_id(), unit.container_id()),
                    quantity: unit.quantity(),
                    moved_by: ctx.actor_id,
                    reason: request.reason,
                },
                now,
                "move_unit",
            )
            .await;
        self.publisher.publish(&InventoryEvent::moved(
            &unit,
            from_location,
            from_container,
            ctx.actor_id,
        ));

        Ok(unit)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn archive(&self, ctx: &WorkspaceContext, id: InventoryId) -> ServiceResult<InventoryUnit> {
        let (_guard, mut unit) = self.load_locked(ctx, id).await?;
        unit.archive(Utc::now());
        self.units.save(&unit).await?;
        self.publisher
            .publish(&InventoryEvent::archived(&unit, ctx.actor_id));
        Ok(unit)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn restore(&self, ctx: &WorkspaceContext, id: InventoryId) -> ServiceResult<InventoryUnit> {
        let (_guard, mut unit) = self.load_locked(ctx, id).await?;
        unit.restore(Utc::now());
        self.units.save(&unit).await?;
        self.publisher
            .publish(&InventoryEvent::restored(&unit, ctx.actor_id));
        Ok(unit)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list(
        &self,
        ctx: &WorkspaceContext,
        include_archived: bool,
    ) -> ServiceResult<Vec<InventoryUnit>> {
        Ok(self.units.list(ctx.tenant()?, include_archived).await?)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list_by_item(
        &self,
        ctx: &WorkspaceContext,
        item_id: ItemId,
    ) -> ServiceResult<Vec<InventoryUnit>> {
        Ok(self.units.find_by_item(ctx.tenant()?, item_id).await?)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list_by_location(
        &self,
        ctx: &WorkspaceContext,
        location_id: LocationId,
    ) -> ServiceResult<Vec<InventoryUnit>> {
        Ok(self.units.find_by_location(ctx.tenant()?, location_id).await?)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list_by_container(
        &self,
        ctx: &WorkspaceContext,
        container_id: ContainerId,
    ) -> ServiceResult<Vec<InventoryUnit>> {
        Ok(self.units.find_by_container(ctx.tenant()?, container_id).await?)
    }

    /// Non-archived `AVAILABLE` units of an item that still hold stock.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn available_for_item(
        &self,
        ctx: &WorkspaceContext,
        item_id: ItemId,
    ) -> ServiceResult<Vec<InventoryUnit>> {
        Ok(self.units.find_available(ctx.tenant()?, item_id).await?)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn total_quantity_for_item(
        &self,
        ctx: &WorkspaceContext,
        item_id: ItemId,
    ) -> ServiceResult<i64> {
        Ok(self.units.total_quantity(ctx.tenant()?, item_id).await?)
    }

    /// Movement records of a unit, newest first.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, inventory_id = %id), err)]
    pub async fn movement_history(
        &self,
        ctx: &WorkspaceContext,
        id: InventoryId,
    ) -> ServiceResult<Vec<Movement>> {
        let unit = self.load(ctx, id).await?;
        self.movements.history(unit.workspace_id(), *unit.id()).await
    }
}
