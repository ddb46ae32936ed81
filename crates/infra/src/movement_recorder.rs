//! Movement audit log writer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use stowage_core::{InventoryId, TenantId};
use stowage_inventory::{Movement, NewMovement};

use crate::repository::MovementRepository;
use crate::services::ServiceResult;

#[derive(Clone)]
pub struct MovementRecorder {
    repo: Arc<dyn MovementRepository>,
}

impl MovementRecorder {
    pub fn new(repo: Arc<dyn MovementRepository>) -> Self {
        Self { repo }
    }

    /// Validate and append one record.
    pub async fn record_movement(
        &self,
        new: NewMovement,
        now: DateTime<Utc>,
    ) -> ServiceResult<Movement> {
        let movement = Movement::record(new, now)?;
        self.repo.append(&movement).await?;
        Ok(movement)
    }

    /// Append one record, logging and dropping any failure.
    ///
    /// Used after a unit change has already been persisted: the audit trail
    /// may miss an entry, the change itself stands.
    pub async fn record_best_effort(
        &self,
        new: NewMovement,
        now: DateTime<Utc>,
        operation: &'static str,
    ) -> Option<Movement> {
        let tenant_id = new.workspace_id;
        let inventory_id = new.inventory_id;
        match self.record_movement(new, now).await {
            Ok(movement) => Some(movement),
            Err(error) => {
                tracing::warn!(
                    operation,
                    tenant_id = %tenant_id,
                    inventory_id = %inventory_id,
                    %error,
                    "failed to record movement"
                );
                None
            }
        }
    }

    /// Movements of one unit, newest first.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, inventory_id = %inventory_id), err)]
    pub async fn history(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> ServiceResult<Vec<Movement>> {
        Ok(self.repo.list_for_unit(tenant_id, inventory_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::{LocationId, UserId};
    use stowage_inventory::Placement;

    use crate::repository::InMemoryMovementRepository;

    fn new_movement(tenant_id: TenantId, inventory_id: InventoryId) -> NewMovement {
        NewMovement {
            workspace_id: tenant_id,
            inventory_id,
            from: Placement::nowhere(),
            to: Placement::at(LocationId::new(), None),
            quantity: 2,
            moved_by: Some(UserId::new()),
            reason: Some("initial stock".to_string()),
        }
    }

    #[tokio::test]
    async fn recorded_movements_show_up_in_history() {
        let recorder = MovementRecorder::new(Arc::new(InMemoryMovementRepository::new()));
        let tenant = TenantId::new();
        let unit = InventoryId::new();

        let movement = recorder
            .record_movement(new_movement(tenant, unit), Utc::now())
            .await
            .unwrap();
        assert!(movement.is_initial_placement());

        let history = recorder.history(tenant, unit).await.unwrap();
        assert_eq!(history, vec![movement]);
    }

    #[tokio::test]
    async fn invalid_movement_is_dropped_by_best_effort_path() {
        let recorder = MovementRecorder::new(Arc::new(InMemoryMovementRepository::new()));
        let tenant = TenantId::new();
        let unit = InventoryId::new();

        let mut bad = new_movement(tenant, unit);
        bad.to = Placement::nowhere();
        assert!(recorder.record_movement(bad.clone(), Utc::now()).await.is_err());
        assert!(recorder
            .record_best_effort(bad, Utc::now(), "test")
            .await
            .is_none());
        assert!(recorder.history(tenant, unit).await.unwrap().is_empty());
    }
}
