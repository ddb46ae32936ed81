//! Tenant-isolated in-memory table shared by the in-memory adapters.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stowage_core::{Entity, TenantId};

use super::{RepositoryError, RepositoryResult};

/// Rows keyed by entity id, each remembering its owning tenant.
///
/// Keying by id alone (rather than `(tenant, id)`) lets `upsert` refuse a write
/// that would move a record into a different tenant.
#[derive(Debug)]
pub struct TenantTable<E: Entity> {
    rows: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> Default for TenantTable<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> TenantTable<E>
where
    E: Entity + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, HashMap<E::Id, E>>> {
        self.rows
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    pub(crate) fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, HashMap<E::Id, E>>> {
        self.rows
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    pub fn get(&self, tenant_id: TenantId, id: &E::Id) -> RepositoryResult<Option<E>> {
        let rows = self.read()?;
        Ok(rows.get(id).filter(|e| e.tenant_id() == tenant_id).cloned())
    }

    pub fn upsert(&self, entity: &E) -> RepositoryResult<()> {
        let mut rows = self.write()?;
        Self::upsert_locked(&mut rows, entity)
    }

    /// `upsert` for callers already holding the write guard.
    pub(crate) fn upsert_locked(rows: &mut HashMap<E::Id, E>, entity: &E) -> RepositoryResult<()> {
        if let Some(existing) = rows.get(entity.id()) {
            if existing.tenant_id() != entity.tenant_id() {
                return Err(RepositoryError::TenantIsolation);
            }
        }
        rows.insert(*entity.id(), entity.clone());
        Ok(())
    }

    /// Rows of one tenant matching `pred`, in no particular order.
    pub fn select<F>(&self, tenant_id: TenantId, pred: F) -> RepositoryResult<Vec<E>>
    where
        F: Fn(&E) -> bool,
    {
        let rows = self.read()?;
        Ok(rows
            .values()
            .filter(|e| e.tenant_id() == tenant_id && pred(e))
            .cloned()
            .collect())
    }

    pub fn remove(&self, tenant_id: TenantId, id: &E::Id) -> RepositoryResult<bool> {
        let mut rows = self.write()?;
        match rows.get(id) {
            Some(e) if e.tenant_id() == tenant_id => {
                rows.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
