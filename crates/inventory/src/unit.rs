use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stowage_core::{
    ContainerId, DomainError, DomainResult, Entity, InventoryId, ItemId, LocationId, TenantId,
};

use crate::condition::{Condition, Status};

/// Optional commercial/lifecycle metadata.
///
/// None of these carry invariants beyond "present or absent". The price is an
/// integer amount in minor currency units; the currency code is opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDetails {
    pub acquisition_date: Option<NaiveDate>,
    pub purchase_price: Option<i64>,
    pub currency_code: Option<String>,
    pub warranty_expires: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input for [`InventoryUnit::create`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInventoryUnit {
    pub workspace_id: TenantId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub container_id: Option<ContainerId>,
    pub quantity: i64,
    pub condition: Condition,
    pub status: Status,
    pub currency_code: Option<String>,
}

/// Input for [`InventoryUnit::update`].
///
/// `details` replaces the unit's metadata wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUpdate {
    pub location_id: LocationId,
    pub container_id: Option<ContainerId>,
    pub quantity: i64,
    pub condition: Condition,
    pub details: UnitDetails,
}

/// Raw field set used by storage adapters to rebuild a unit.
///
/// No validation happens here; the stored row was validated when written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryUnitParts {
    pub id: InventoryId,
    pub workspace_id: TenantId,
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub container_id: Option<ContainerId>,
    pub quantity: i64,
    pub condition: Condition,
    pub status: Status,
    pub details: UnitDetails,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A countable batch of one catalog item in one physical place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUnit {
    id: InventoryId,
    workspace_id: TenantId,
    item_id: ItemId,
    location_id: LocationId,
    container_id: Option<ContainerId>,
    quantity: i64,
    condition: Condition,
    status: Status,
    details: UnitDetails,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn ensure_positive_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be greater than zero"));
    }
    Ok(())
}

impl InventoryUnit {
    /// Validate and build a new unit.
    pub fn create(new: NewInventoryUnit, now: DateTime<Utc>) -> DomainResult<Self> {
        let workspace_id = new.workspace_id.require("workspace_id")?;
        let item_id = new.item_id.require("item_id")?;
        let location_id = new.location_id.require("location_id")?;
        ensure_positive_quantity(new.quantity)?;

        Ok(Self {
            id: InventoryId::new(),
            workspace_id,
            item_id,
            location_id,
            container_id: new.container_id,
            quantity: new.quantity,
            condition: new.condition,
            status: new.status,
            details: UnitDetails {
                currency_code: new.currency_code,
                ..UnitDetails::default()
            },
            is_archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rehydrate(parts: InventoryUnitParts) -> Self {
        Self {
            id: parts.id,
            workspace_id: parts.workspace_id,
            item_id: parts.item_id,
            location_id: parts.location_id,
            container_id: parts.container_id,
            quantity: parts.quantity,
            condition: parts.condition,
            status: parts.status,
            details: parts.details,
            is_archived: parts.is_archived,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn workspace_id(&self) -> TenantId {
        self.workspace_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    pub fn container_id(&self) -> Option<ContainerId> {
        self.container_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn details(&self) -> &UnitDetails {
        &self.details
    }

    pub fn is_archived(&self) -> bool {
        self.is_archived
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace placement, quantity, condition and metadata in one step.
    ///
    /// Quantity must stay positive here; only [`update_quantity`](Self::update_quantity)
    /// may bring a unit down to zero.
    pub fn update(&mut self, update: InventoryUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let location_id = update.location_id.require("location_id")?;
        ensure_positive_quantity(update.quantity)?;

        self.location_id = location_id;
        self.container_id = update.container_id;
        self.quantity = update.quantity;
        self.condition = update.condition;
        self.details = update.details;
        self.updated_at = now;
        Ok(())
    }

    /// Set the handling status. Any status may follow any other.
    pub fn update_status(&mut self, status: Status, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Set the quantity. Zero means "all consumed/moved out".
    pub fn update_quantity(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        self.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    /// Change placement.
    ///
    /// Whether the container actually sits inside the location is checked by
    /// the location domain, not here.
    pub fn move_to(
        &mut self,
        location_id: LocationId,
        container_id: Option<ContainerId>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.location_id = location_id.require("location_id")?;
        self.container_id = container_id;
        self.updated_at = now;
        Ok(())
    }

    pub fn archive(&mut self, now: DateTime<Utc>) {
        self.is_archived = true;
        self.updated_at = now;
    }

    pub fn restore(&mut self, now: DateTime<Utc>) {
        self.is_archived = false;
        self.updated_at = now;
    }
}

impl Entity for InventoryUnit {
    type Id = InventoryId;

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
    use chrono::Duration;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_unit(quantity: i64) -> NewInventoryUnit {
        NewInventoryUnit {
            workspace_id: TenantId::new(),
            item_id: ItemId::new(),
            location_id: LocationId::new(),
            container_id: None,
            quantity,
            condition: Condition::New,
            status: Status::Available,
            currency_code: Some("EUR".to_string()),
        }
    }

    fn created(quantity: i64) -> InventoryUnit {
        InventoryUnit::create(new_unit(quantity), test_time()).unwrap()
    }

    fn update_with_quantity(unit: &InventoryUnit, quantity: i64) -> InventoryUpdate {
        InventoryUpdate {
            location_id: unit.location_id(),
            container_id: unit.container_id(),
            quantity,
            condition: Condition::Good,
            details: UnitDetails::default(),
        }
    }

    #[test]
    fn create_sets_fields_and_timestamps() {
        let input = new_unit(5);
        let now = test_time();
        let unit = InventoryUnit::create(input.clone(), now).unwrap();

        assert_eq!(unit.workspace_id(), input.workspace_id);
        assert_eq!(unit.item_id(), input.item_id);
        assert_eq!(unit.location_id(), input.location_id);
        assert_eq!(unit.quantity(), 5);
        assert_eq!(unit.condition(), Condition::New);
        assert_eq!(unit.status(), Status::Available);
        assert_eq!(unit.details().currency_code.as_deref(), Some("EUR"));
        assert!(!unit.is_archived());
        assert_eq!(unit.created_at(), now);
        assert_eq!(unit.updated_at(), now);
    }

    #[test]
    fn create_rejects_missing_references() {
        for field in ["workspace_id", "item_id", "location_id"] {
            let mut input = new_unit(1);
            match field {
                "workspace_id" => input.workspace_id = TenantId::nil(),
                "item_id" => input.item_id = ItemId::nil(),
                _ => input.location_id = LocationId::nil(),
            }
            let err = InventoryUnit::create(input, test_time()).unwrap_err();
            assert_eq!(err, DomainError::validation(format!("{field} is required")));
        }
    }

    #[test]
    fn update_rejects_zero_quantity_and_leaves_unit_unchanged() {
        let mut unit = created(5);
        let before = unit.clone();

        let err = unit
            .update(update_with_quantity(&before, 0), test_time())
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(unit, before);
    }

    #[test]
    fn update_replaces_metadata() {
        let mut unit = created(5);
        let mut update = update_with_quantity(&unit, 7);
        update.details = UnitDetails {
            acquisition_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            purchase_price: Some(12_99),
            currency_code: Some("USD".to_string()),
            notes: Some("second shelf".to_string()),
            ..UnitDetails::default()
        };

        let later = unit.updated_at() + Duration::seconds(5);
        unit.update(update.clone(), later).unwrap();

        assert_eq!(unit.quantity(), 7);
        assert_eq!(unit.condition(), Condition::Good);
        assert_eq!(unit.details(), &update.details);
        assert_eq!(unit.updated_at(), later);
    }

    #[test]
    fn update_accepts_every_condition() {
        let mut unit = created(5);
        for condition in Condition::ALL {
            let update = InventoryUpdate {
                condition,
                ..update_with_quantity(&unit, 5)
            };
            unit.update(update, test_time()).unwrap();
            assert_eq!(unit.condition(), condition);
        }
    }

    #[test]
    fn update_quantity_allows_zero() {
        let mut unit = created(5);
        unit.update_quantity(0, test_time()).unwrap();
        assert_eq!(unit.quantity(), 0);
    }

    #[test]
    fn move_requires_location() {
        let mut unit = created(2);
        let before = unit.clone();
        let err = unit
            .move_to(LocationId::nil(), Some(ContainerId::new()), test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(unit, before);

        let target = LocationId::new();
        let container = ContainerId::new();
        unit.move_to(target, Some(container), test_time()).unwrap();
        assert_eq!(unit.location_id(), target);
        assert_eq!(unit.container_id(), Some(container));
    }

    #[test]
    fn archive_is_idempotent_and_restore_reverts() {
        let mut unit = created(1);
        unit.archive(test_time());
        assert!(unit.is_archived());
        unit.archive(test_time());
        assert!(unit.is_archived());
        unit.restore(test_time());
        assert!(!unit.is_archived());
    }

    #[test]
    fn any_status_may_follow_any_other() {
        let mut unit = created(1);
        for from in Status::ALL {
            for to in Status::ALL {
                unit.update_status(from, test_time());
                unit.update_status(to, test_time());
                assert_eq!(unit.status(), to);
            }
        }
    }

    #[test]
    fn mutators_refresh_updated_at() {
        let mut unit = created(3);
        let created_at = unit.created_at();
        let t1 = created_at + Duration::seconds(1);
        unit.update_status(Status::InUse, t1);
        assert_eq!(unit.updated_at(), t1);

        let t2 = t1 + Duration::seconds(1);
        unit.update_quantity(1, t2).unwrap();
        assert_eq!(unit.updated_at(), t2);

        let t3 = t2 + Duration::seconds(1);
        unit.archive(t3);
        assert_eq!(unit.updated_at(), t3);
        assert_eq!(unit.created_at(), created_at);
    }

    proptest! {
        #[test]
        fn create_rejects_non_positive_quantity(quantity in i64::MIN..=0) {
            let err = InventoryUnit::create(new_unit(quantity), test_time()).unwrap_err();
            prop_assert!(matches!(err, DomainError::Validation(_)));
        }

        #[test]
        fn create_accepts_positive_quantity(quantity in 1i64..=i64::MAX) {
            let unit = InventoryUnit::create(new_unit(quantity), test_time()).unwrap();
            prop_assert_eq!(unit.quantity(), quantity);
        }

        #[test]
        fn update_quantity_rejects_negative(quantity in i64::MIN..0) {
            let mut unit = created(4);
            let err = unit.update_quantity(quantity, test_time()).unwrap_err();
            prop_assert!(matches!(err, DomainError::Validation(_)));
            prop_assert_eq!(unit.quantity(), 4);
        }

        #[test]
        fn update_quantity_accepts_non_negative(quantity in 0i64..=i64::MAX) {
            let mut unit = created(4);
            prop_assert!(unit.update_quantity(quantity, test_time()).is_ok());
            prop_assert_eq!(unit.quantity(), quantity);
        }
    }
}
