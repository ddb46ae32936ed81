use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use stowage_core::{BorrowerId, DomainError};
use stowage_loans::{Borrower, BorrowerUpdate, NewBorrower};

use super::{ServiceResult, WorkspaceContext};
use crate::repository::BorrowerRepository;

#[derive(Clone)]
pub struct BorrowerService {
    borrowers: Arc<dyn BorrowerRepository>,
}

impl BorrowerService {
    pub fn new(borrowers: Arc<dyn BorrowerRepository>) -> Self {
        Self { borrowers }
    }

    async fn load(&self, ctx: &WorkspaceContext, id: BorrowerId) -> ServiceResult<Borrower> {
        self.borrowers
            .find_by_id(ctx.tenant()?, id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    #[instrument(skip(self, ctx, new), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn create(&self, ctx: &WorkspaceContext, new: NewBorrower) -> ServiceResult<Borrower> {
        let new = NewBorrower {
            workspace_id: ctx.tenant()?,
            ..new
        };
        let borrower = Borrower::create(new, Utc::now())?;
        self.borrowers.save(&borrower).await?;
        Ok(borrower)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, borrower_id = %id), err)]
    pub async fn get(&self, ctx: &WorkspaceContext, id: BorrowerId) -> ServiceResult<Borrower> {
        self.load(ctx, id).await
    }

    #[instrument(skip(self, ctx, update), fields(tenant_id = %ctx.tenant_id, borrower_id = %id), err)]
    pub async fn update(
        &self,
        ctx: &WorkspaceContext,
        id: BorrowerId,
        update: BorrowerUpdate,
    ) -> ServiceResult<Borrower> {
        let mut borrower = self.load(ctx, id).await?;
        borrower.update(update, Utc::now())?;
        self.borrowers.save(&borrower).await?;
        Ok(borrower)
    }

    /// Archived borrowers keep their loans but cannot take new ones.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, borrower_id = %id), err)]
    pub async fn archive(&self, ctx: &WorkspaceContext, id: BorrowerId) -> ServiceResult<Borrower> {
        let mut borrower = self.load(ctx, id).await?;
        borrower.archive(Utc::now());
        self.borrowers.save(&borrower).await?;
        Ok(borrower)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id, borrower_id = %id), err)]
    pub async fn restore(&self, ctx: &WorkspaceContext, id: BorrowerId) -> ServiceResult<Borrower> {
        let mut borrower = self.load(ctx, id).await?;
        borrower.restore(Utc::now());
        self.borrowers.save(&borrower).await?;
        Ok(borrower)
    }

    /// Borrowers ordered by name.
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id), err)]
    pub async fn list(
        &self,
        ctx: &WorkspaceContext,
        include_archived: bool,
    ) -> ServiceResult<Vec<Borrower>> {
        Ok(self.borrowers.list(ctx.tenant()?, include_archived).await?)
    }
}
