use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stowage_core::{BorrowerId, DomainError, DomainResult, Entity, TenantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBorrower {
    pub workspace_id: TenantId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerUpdate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Raw field set used by storage adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowerParts {
    pub id: BorrowerId,
    pub workspace_id: TenantId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// External party who can hold a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    id: BorrowerId,
    workspace_id: TenantId,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    notes: Option<String>,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn normalize_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

impl Borrower {
    pub fn create(new: NewBorrower, now: DateTime<Utc>) -> DomainResult<Self> {
        let workspace_id = new.workspace_id.require("workspace_id")?;
        let name = normalize_name(&new.name)?;

        Ok(Self {
            id: BorrowerId::new(),
            workspace_id,
            name,
            email: new.email,
            phone: new.phone,
            notes: new.notes,
            is_archived: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn rehydrate(parts: BorrowerParts) -> Self {
        Self {
            id: parts.id,
            workspace_id: parts.workspace_id,
            name: parts.name,
            email: parts.email,
            phone: parts.phone,
            notes: parts.notes,
            is_archived: parts.is_archived,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn workspace_id(&self) -> TenantId {
        self.workspace_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
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

    pub fn update(&mut self, update: BorrowerUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        self.name = normalize_name(&update.name)?;
        self.email = update.email;
        self.phone = update.phone;
        self.notes = update.notes;
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

impl Entity for Borrower {
    type Id = BorrowerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.workspace_id
    }
}
