//! Entity trait: identity + tenant ownership + continuity across state changes.

use crate::id::TenantId;

/// Entity marker + minimal interface.
///
/// Every entity in this system belongs to exactly one tenant; stores use the
/// pair `(tenant_id, id)` as the lookup key so cross-tenant reads resolve to
/// nothing.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the owning tenant.
    fn tenant_id(&self) -> TenantId;
}
