//! Postgres-backed repositories.
//!
//! Runtime-checked `sqlx::query` against the schema in
//! `migrations/0001_inventory_loans.sql`. Every statement filters on
//! `workspace_id`, so rows owned by another tenant are never read or written.
//!
//! ## Error Mapping
//!
//! | SQLx Error | RepositoryError |
//! |------------|-----------------|
//! | `PoolClosed`, `PoolTimedOut`, `Io`, `Tls` | `Unavailable` |
//! | `ColumnDecode`, `Decode`, `ColumnNotFound` | `Serialization` |
//! | `Database` and everything else | `Storage` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::field::Empty;
use tracing::{instrument, Span};
use uuid::Uuid;

use stowage_core::{
    BorrowerId, ContainerId, Entity, InventoryId, ItemId, LoanId, LocationId, MovementId,
    TenantId, UserId,
};
use stowage_inventory::{
    Condition, InventoryUnit, InventoryUnitParts, Movement, Placement, Status, UnitDetails,
};
use stowage_loans::{Borrower, BorrowerParts, Loan, LoanParts};

use super::{
    Admission, BorrowerRepository, InventoryRepository, LoanRepository, MovementRepository,
    RepositoryError, RepositoryResult,
};

const SCHEMA: &str = include_str!("../../migrations/0001_inventory_loans.sql");

const UNIT_COLUMNS: &str = "id, workspace_id, item_id, location_id, container_id, quantity, \
    condition, status, acquisition_date, purchase_price, currency_code, warranty_expires, \
    expiration_date, notes, is_archived, created_at, updated_at";

const LOAN_COLUMNS: &str = "id, workspace_id, inventory_id, borrower_id, quantity, loaned_at, \
    due_date, returned_at, notes, created_at, updated_at";

const BORROWER_COLUMNS: &str =
    "id, workspace_id, name, email, phone, notes, is_archived, created_at, updated_at";

/// Creates the tables and indexes if they are missing.
pub struct PostgresSchema;

impl PostgresSchema {
    #[instrument(skip(pool), err)]
    pub async fn apply(pool: &PgPool) -> RepositoryResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            RepositoryError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => RepositoryError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => {
            RepositoryError::Unavailable(format!("tls error in {operation}: {e}"))
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => {
            RepositoryError::Serialization(format!("failed to decode row in {operation}: {err}"))
        }
        sqlx::Error::Database(db_err) => RepositoryError::Storage(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        _ => RepositoryError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> RepositoryResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::Serialization(format!("column {name}: {e}")))
}

/// Decide a loan insert from the unit row read under `FOR UPDATE`. A missing
/// row has nothing left to lend.
fn admit_locked(locked: Option<(i64, Status)>, on_loan: i64, requested: i64) -> Admission {
    let quantity = match locked {
        Some((_, status)) if status != Status::Available => return Admission::Unavailable,
        Some((quantity, _)) => quantity,
        None => 0,
    };
    let remaining = (quantity - on_loan).max(0);
    if requested > remaining {
        Admission::Exceeded { remaining }
    } else {
        Admission::Admitted
    }
}

fn unit_from_row(row: &PgRow) -> RepositoryResult<InventoryUnit> {
    let condition: String = column(row, "condition")?;
    let status: String = column(row, "status")?;

    Ok(InventoryUnit::rehydrate(InventoryUnitParts {
        id: InventoryId::from_uuid(column(row, "id")?),
        workspace_id: TenantId::from_uuid(column(row, "workspace_id")?),
        item_id: ItemId::from_uuid(column(row, "item_id")?),
        location_id: LocationId::from_uuid(column(row, "location_id")?),
        container_id: column::<Option<Uuid>>(row, "container_id")?.map(ContainerId::from_uuid),
        quantity: column(row, "quantity")?,
        condition: condition
            .parse::<Condition>()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        status: status
            .parse::<Status>()
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        details: UnitDetails {
            acquisition_date: column(row, "acquisition_date")?,
            purchase_price: column(row, "purchase_price")?,
            currency_code: column(row, "currency_code")?,
            warranty_expires: column(row, "warranty_expires")?,
            expiration_date: column(row, "expiration_date")?,
            notes: column(row, "notes")?,
        },
        is_archived: column(row, "is_archived")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    }))
}

fn loan_from_row(row: &PgRow) -> RepositoryResult<Loan> {
    Ok(Loan::rehydrate(LoanParts {
        id: LoanId::from_uuid(column(row, "id")?),
        workspace_id: TenantId::from_uuid(column(row, "workspace_id")?),
        inventory_id: InventoryId::from_uuid(column(row, "inventory_id")?),
        borrower_id: BorrowerId::from_uuid(column(row, "borrower_id")?),
        quantity: column(row, "quantity")?,
        loaned_at: column(row, "loaned_at")?,
        due_date: column(row, "due_date")?,
        returned_at: column(row, "returned_at")?,
        notes: column(row, "notes")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    }))
}

fn borrower_from_row(row: &PgRow) -> RepositoryResult<Borrower> {
    Ok(Borrower::rehydrate(BorrowerParts {
        id: BorrowerId::from_uuid(column(row, "id")?),
        workspace_id: TenantId::from_uuid(column(row, "workspace_id")?),
        name: column(row, "name")?,
        email: column(row, "email")?,
        phone: column(row, "phone")?,
        notes: column(row, "notes")?,
        is_archived: column(row, "is_archived")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    }))
}

fn movement_from_row(row: &PgRow) -> RepositoryResult<Movement> {
    let from = Placement {
        location_id: column::<Option<Uuid>>(row, "from_location_id")?.map(LocationId::from_uuid),
        container_id: column::<Option<Uuid>>(row, "from_container_id")?
            .map(ContainerId::from_uuid),
    };
    let to = Placement {
        location_id: column::<Option<Uuid>>(row, "to_location_id")?.map(LocationId::from_uuid),
        container_id: column::<Option<Uuid>>(row, "to_container_id")?.map(ContainerId::from_uuid),
    };

    Ok(Movement::rehydrate(
        MovementId::from_uuid(column(row, "id")?),
        TenantId::from_uuid(column(row, "workspace_id")?),
        InventoryId::from_uuid(column(row, "inventory_id")?),
        from,
        to,
        column(row, "quantity")?,
        column::<Option<Uuid>>(row, "moved_by")?.map(UserId::from_uuid),
        column(row, "reason")?,
        column(row, "created_at")?,
    ))
}

fn collect<T>(
    rows: Vec<PgRow>,
    map: impl Fn(&PgRow) -> RepositoryResult<T>,
) -> RepositoryResult<Vec<T>> {
    let span = Span::current();
    span.record("row_count", rows.len());
    rows.iter().map(map).collect()
}

/// Postgres-backed inventory unit repository.
#[derive(Debug, Clone)]
pub struct PostgresInventoryRepository {
    pool: Arc<PgPool>,
}

impl PostgresInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch_where(
        &self,
        operation: &str,
        filter: &str,
        tenant_id: TenantId,
        arg: Option<Uuid>,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        let sql = format!(
            "SELECT {UNIT_COLUMNS} FROM inventory_units \
             WHERE workspace_id = $1 AND {filter} \
             ORDER BY created_at ASC, id ASC"
        );
        let mut query = sqlx::query(&sql).bind(tenant_id.as_uuid());
        if let Some(arg) = arg {
            query = query.bind(arg);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        collect(rows, unit_from_row)
    }
}

#[async_trait]
impl InventoryRepository for PostgresInventoryRepository {
    #[instrument(
        skip(self, unit),
        fields(tenant_id = %unit.workspace_id(), inventory_id = %unit.id()),
        err
    )]
    async fn save(&self, unit: &InventoryUnit) -> RepositoryResult<()> {
        let details = unit.details();
        // The conflict branch only fires for the owning tenant; a foreign row
        // leaves rows_affected at zero.
        let result = sqlx::query(
            r#"
            INSERT INTO inventory_units (
                id, workspace_id, item_id, location_id, container_id, quantity,
                condition, status, acquisition_date, purchase_price, currency_code,
                warranty_expires, expiration_date, notes, is_archived, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                item_id = EXCLUDED.item_id,
                location_id = EXCLUDED.location_id,
                container_id = EXCLUDED.container_id,
                quantity = EXCLUDED.quantity,
                condition = EXCLUDED.condition,
                status = EXCLUDED.status,
                acquisition_date = EXCLUDED.acquisition_date,
                purchase_price = EXCLUDED.purchase_price,
                currency_code = EXCLUDED.currency_code,
                warranty_expires = EXCLUDED.warranty_expires,
                expiration_date = EXCLUDED.expiration_date,
                notes = EXCLUDED.notes,
                is_archived = EXCLUDED.is_archived,
                updated_at = EXCLUDED.updated_at
            WHERE inventory_units.workspace_id = EXCLUDED.workspace_id
            "#,
        )
        .bind(unit.id().as_uuid())
        .bind(unit.workspace_id().as_uuid())
        .bind(unit.item_id().as_uuid())
        .bind(unit.location_id().as_uuid())
        .bind(unit.container_id().map(Uuid::from))
        .bind(unit.quantity())
        .bind(unit.condition().as_str())
        .bind(unit.status().as_str())
        .bind(details.acquisition_date)
        .bind(details.purchase_price)
        .bind(details.currency_code.as_deref())
        .bind(details.warranty_expires)
        .bind(details.expiration_date)
        .bind(details.notes.as_deref())
        .bind(unit.is_archived())
        .bind(unit.created_at())
        .bind(unit.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_inventory_unit", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::TenantIsolation);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, inventory_id = %id), err)]
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: InventoryId,
    ) -> RepositoryResult<Option<InventoryUnit>> {
        let sql = format!(
            "SELECT {UNIT_COLUMNS} FROM inventory_units WHERE workspace_id = $1 AND id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_inventory_unit", e))?;
        row.as_ref().map(unit_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, row_count = Empty), err)]
    async fn list(
        &self,
        tenant_id: TenantId,
        include_archived: bool,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        let filter = if include_archived {
            "TRUE"
        } else {
            "is_archived = FALSE"
        };
        self.fetch_where("list_inventory_units", filter, tenant_id, None)
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, item_id = %item_id, row_count = Empty), err)]
    async fn find_by_item(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.fetch_where(
            "find_units_by_item",
            "is_archived = FALSE AND item_id = $2",
            tenant_id,
            Some(*item_id.as_uuid()),
        )
        .await
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, location_id = %location_id, row_count = Empty),
        err
    )]
    async fn find_by_location(
        &self,
        tenant_id: TenantId,
        location_id: LocationId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.fetch_where(
            "find_units_by_location",
            "is_archived = FALSE AND location_id = $2",
            tenant_id,
            Some(*location_id.as_uuid()),
        )
        .await
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, container_id = %container_id, row_count = Empty),
        err
    )]
    async fn find_by_container(
        &self,
        tenant_id: TenantId,
        container_id: ContainerId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        self.fetch_where(
            "find_units_by_container",
            "is_archived = FALSE AND container_id = $2",
            tenant_id,
            Some(*container_id.as_uuid()),
        )
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, item_id = %item_id, row_count = Empty), err)]
    async fn find_available(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> RepositoryResult<Vec<InventoryUnit>> {
        let filter = format!(
            "is_archived = FALSE AND item_id = $2 AND status = '{}' AND quantity > 0",
            Status::Available.as_str()
        );
        self.fetch_where(
            "find_available_units",
            &filter,
            tenant_id,
            Some(*item_id.as_uuid()),
        )
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, item_id = %item_id), err)]
    async fn total_quantity(&self, tenant_id: TenantId, item_id: ItemId) -> RepositoryResult<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT AS total
            FROM inventory_units
            WHERE workspace_id = $1 AND item_id = $2 AND is_archived = FALSE
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(item_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("total_quantity", e))?;
        column(&row, "total")
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, inventory_id = %id), err)]
    async fn delete(&self, tenant_id: TenantId, id: InventoryId) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM inventory_units WHERE workspace_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_inventory_unit", e))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Postgres-backed loan repository.
#[derive(Debug, Clone)]
pub struct PostgresLoanRepository {
    pool: Arc<PgPool>,
}

impl PostgresLoanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch_where(
        &self,
        operation: &str,
        filter: &str,
        order: &str,
        tenant_id: TenantId,
        arg: Option<Uuid>,
    ) -> RepositoryResult<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE workspace_id = $1 AND {filter} ORDER BY {order}"
        );
        let mut query = sqlx::query(&sql).bind(tenant_id.as_uuid());
        if let Some(arg) = arg {
            query = query.bind(arg);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        collect(rows, loan_from_row)
    }
}

const NEWEST_FIRST: &str = "loaned_at DESC, id DESC";

#[async_trait]
impl LoanRepository for PostgresLoanRepository {
    #[instrument(skip(self, loan), fields(tenant_id = %loan.workspace_id(), loan_id = %loan.id()), err)]
    async fn save(&self, loan: &Loan) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO loans (
                id, workspace_id, inventory_id, borrower_id, quantity, loaned_at,
                due_date, returned_at, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                due_date = EXCLUDED.due_date,
                returned_at = EXCLUDED.returned_at,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at
            WHERE loans.workspace_id = EXCLUDED.workspace_id
            "#,
        )
        .bind(loan.id().as_uuid())
        .bind(loan.workspace_id().as_uuid())
        .bind(loan.inventory_id().as_uuid())
        .bind(loan.borrower_id().as_uuid())
        .bind(loan.quantity())
        .bind(loan.loaned_at())
        .bind(loan.due_date())
        .bind(loan.returned_at())
        .bind(loan.notes())
        .bind(loan.created_at())
        .bind(loan.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_loan", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::TenantIsolation);
        }
        Ok(())
    }

    /// Locks the unit row, sums its active loans and inserts in one
    /// transaction. The locked row's quantity and status win over the
    /// caller's copy.
    #[instrument(
        skip(self, loan),
        fields(
            tenant_id = %loan.workspace_id(),
            inventory_id = %loan.inventory_id(),
            requested = loan.quantity(),
            remaining = Empty
        ),
        err
    )]
    async fn insert_within(&self, loan: &Loan, unit_quantity: i64) -> RepositoryResult<Admission> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let locked = sqlx::query(
            "SELECT quantity, status FROM inventory_units WHERE workspace_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(loan.workspace_id().as_uuid())
        .bind(loan.inventory_id().as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_inventory_unit", e))?;

        let locked = match locked {
            Some(row) => {
                let status: String = column(&row, "status")?;
                let status = status
                    .parse::<Status>()
                    .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
                Some((column::<i64>(&row, "quantity")?, status))
            }
            None => {
                tracing::debug!(unit_quantity, "unit row vanished before loan insert");
                None
            }
        };

        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT AS on_loan
            FROM loans
            WHERE workspace_id = $1 AND inventory_id = $2 AND returned_at IS NULL
            "#,
        )
        .bind(loan.workspace_id().as_uuid())
        .bind(loan.inventory_id().as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("sum_active_loans", e))?;
        let on_loan: i64 = column(&row, "on_loan")?;

        let admission = admit_locked(locked, on_loan, loan.quantity());
        if let Admission::Exceeded { remaining } = admission {
            Span::current().record("remaining", remaining);
        }
        if admission != Admission::Admitted {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(admission);
        }

        sqlx::query(
            r#"
            INSERT INTO loans (
                id, workspace_id, inventory_id, borrower_id, quantity, loaned_at,
                due_date, returned_at, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(loan.id().as_uuid())
        .bind(loan.workspace_id().as_uuid())
        .bind(loan.inventory_id().as_uuid())
        .bind(loan.borrower_id().as_uuid())
        .bind(loan.quantity())
        .bind(loan.loaned_at())
        .bind(loan.due_date())
        .bind(loan.returned_at())
        .bind(loan.notes())
        .bind(loan.created_at())
        .bind(loan.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_loan", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(Admission::Admitted)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, loan_id = %id), err)]
    async fn find_by_id(&self, tenant_id: TenantId, id: LoanId) -> RepositoryResult<Option<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE workspace_id = $1 AND id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_loan", e))?;
        row.as_ref().map(loan_from_row).transpose()
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, inventory_id = %inventory_id, row_count = Empty),
        err
    )]
    async fn find_active_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Loan>> {
        self.fetch_where(
            "find_active_loans_for_unit",
            "inventory_id = $2 AND returned_at IS NULL",
            NEWEST_FIRST,
            tenant_id,
            Some(*inventory_id.as_uuid()),
        )
        .await
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, inventory_id = %inventory_id, row_count = Empty),
        err
    )]
    async fn find_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Loan>> {
        self.fetch_where(
            "find_loans_for_unit",
            "inventory_id = $2",
            NEWEST_FIRST,
            tenant_id,
            Some(*inventory_id.as_uuid()),
        )
        .await
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, borrower_id = %borrower_id, row_count = Empty),
        err
    )]
    async fn find_for_borrower(
        &self,
        tenant_id: TenantId,
        borrower_id: BorrowerId,
    ) -> RepositoryResult<Vec<Loan>> {
        self.fetch_where(
            "find_loans_for_borrower",
            "borrower_id = $2",
            NEWEST_FIRST,
            tenant_id,
            Some(*borrower_id.as_uuid()),
        )
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, row_count = Empty), err)]
    async fn find_active(&self, tenant_id: TenantId) -> RepositoryResult<Vec<Loan>> {
        self.fetch_where(
            "find_active_loans",
            "returned_at IS NULL",
            NEWEST_FIRST,
            tenant_id,
            None,
        )
        .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, row_count = Empty), err)]
    async fn find_overdue(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Loan>> {
        let sql = format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE workspace_id = $1 AND returned_at IS NULL AND due_date < $2 \
             ORDER BY due_date ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(now)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_overdue_loans", e))?;
        collect(rows, loan_from_row)
    }
}

/// Postgres-backed borrower repository.
#[derive(Debug, Clone)]
pub struct PostgresBorrowerRepository {
    pool: Arc<PgPool>,
}

impl PostgresBorrowerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl BorrowerRepository for PostgresBorrowerRepository {
    #[instrument(
        skip(self, borrower),
        fields(tenant_id = %borrower.workspace_id(), borrower_id = %borrower.id()),
        err
    )]
    async fn save(&self, borrower: &Borrower) -> RepositoryResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO borrowers (
                id, workspace_id, name, email, phone, notes, is_archived, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                notes = EXCLUDED.notes,
                is_archived = EXCLUDED.is_archived,
                updated_at = EXCLUDED.updated_at
            WHERE borrowers.workspace_id = EXCLUDED.workspace_id
            "#,
        )
        .bind(borrower.id().as_uuid())
        .bind(borrower.workspace_id().as_uuid())
        .bind(borrower.name())
        .bind(borrower.email())
        .bind(borrower.phone())
        .bind(borrower.notes())
        .bind(borrower.is_archived())
        .bind(borrower.created_at())
        .bind(borrower.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_borrower", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::TenantIsolation);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, borrower_id = %id), err)]
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: BorrowerId,
    ) -> RepositoryResult<Option<Borrower>> {
        let sql =
            format!("SELECT {BORROWER_COLUMNS} FROM borrowers WHERE workspace_id = $1 AND id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_borrower", e))?;
        row.as_ref().map(borrower_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, row_count = Empty), err)]
    async fn list(
        &self,
        tenant_id: TenantId,
        include_archived: bool,
    ) -> RepositoryResult<Vec<Borrower>> {
        let sql = format!(
            "SELECT {BORROWER_COLUMNS} FROM borrowers \
             WHERE workspace_id = $1 AND ($2 OR is_archived = FALSE) \
             ORDER BY name ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(include_archived)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_borrowers", e))?;
        collect(rows, borrower_from_row)
    }
}

/// Postgres-backed movement log.
#[derive(Debug, Clone)]
pub struct PostgresMovementRepository {
    pool: Arc<PgPool>,
}

impl PostgresMovementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl MovementRepository for PostgresMovementRepository {
    #[instrument(
        skip(self, movement),
        fields(tenant_id = %movement.workspace_id(), inventory_id = %movement.inventory_id()),
        err
    )]
    async fn append(&self, movement: &Movement) -> RepositoryResult<()> {
        let from = movement.from();
        let to = movement.to();
        sqlx::query(
            r#"
            INSERT INTO movements (
                id, workspace_id, inventory_id, from_location_id, from_container_id,
                to_location_id, to_container_id, quantity, moved_by, reason, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(movement.id().as_uuid())
        .bind(movement.workspace_id().as_uuid())
        .bind(movement.inventory_id().as_uuid())
        .bind(from.location_id.map(Uuid::from))
        .bind(from.container_id.map(Uuid::from))
        .bind(to.location_id.map(Uuid::from))
        .bind(to.container_id.map(Uuid::from))
        .bind(movement.quantity())
        .bind(movement.moved_by().map(Uuid::from))
        .bind(movement.reason())
        .bind(movement.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_movement", e))?;
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id, inventory_id = %inventory_id, row_count = Empty),
        err
    )]
    async fn list_for_unit(
        &self,
        tenant_id: TenantId,
        inventory_id: InventoryId,
    ) -> RepositoryResult<Vec<Movement>> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, workspace_id, inventory_id, from_location_id, from_container_id,
                to_location_id, to_container_id, quantity, moved_by, reason, created_at
            FROM movements
            WHERE workspace_id = $1 AND inventory_id = $2
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(inventory_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;
        collect(rows, movement_from_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_every_table() {
        for table in ["inventory_units", "borrowers", "loans", "movements"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn loan_history_restricts_unit_deletion() {
        assert!(SCHEMA.contains("REFERENCES inventory_units (id) ON DELETE RESTRICT"));
        assert!(!SCHEMA.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn locked_admission_rechecks_status_before_quantity() {
        for status in Status::ALL {
            let admission = admit_locked(Some((10, status)), 0, 1);
            if status == Status::Available {
                assert_eq!(admission, Admission::Admitted);
            } else {
                assert_eq!(admission, Admission::Unavailable, "{status:?}");
            }
        }
    }

    #[test]
    fn locked_admission_uses_row_quantity() {
        assert_eq!(
            admit_locked(Some((5, Status::Available)), 3, 2),
            Admission::Admitted
        );
        assert_eq!(
            admit_locked(Some((5, Status::Available)), 3, 3),
            Admission::Exceeded { remaining: 2 }
        );
        assert_eq!(
            admit_locked(Some((2, Status::Available)), 3, 1),
            Admission::Exceeded { remaining: 0 }
        );
        assert_eq!(admit_locked(None, 0, 1), Admission::Exceeded { remaining: 0 });
    }

    #[test]
    fn pool_failures_are_unavailable() {
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolClosed),
            RepositoryError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::RowNotFound),
            RepositoryError::Storage(_)
        ));
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::ColumnNotFound("x".to_string())),
            RepositoryError::Serialization(_)
        ));
    }
}
