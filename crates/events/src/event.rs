use chrono::{DateTime, Utc};
use uuid::Uuid;

use stowage_core::{TenantId, UserId};

/// A domain event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - **tenant-scoped** (every event names the workspace it happened in)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "inventory.unit.moved").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Workspace the event belongs to.
    fn tenant_id(&self) -> TenantId;

    /// Kind of entity the event is about (e.g. "inventory", "loan").
    fn entity_type(&self) -> &'static str;

    /// Identifier of the entity the event is about.
    fn entity_id(&self) -> Uuid;

    /// User who triggered the change, when known.
    fn actor_id(&self) -> Option<UserId>;
}
