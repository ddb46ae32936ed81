//! Wiring: repositories, event bus and services for one backend.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use stowage_events::{EventBus, InMemoryEventBus, Subscription};

use crate::config::{StoreBackend, StowageConfig};
use crate::locks::UnitLocks;
use crate::movement_recorder::MovementRecorder;
use crate::publisher::{EventPublisher, JsonEnvelope};
use crate::repository::{
    BorrowerRepository, InMemoryBorrowerRepository, InMemoryInventoryRepository,
    InMemoryLoanRepository, InMemoryMovementRepository, InventoryRepository, LoanRepository,
    MovementRepository, PostgresBorrowerRepository, PostgresInventoryRepository,
    PostgresLoanRepository, PostgresMovementRepository,
};
use crate::services::{BorrowerService, InventoryService, LoanService};

/// One adapter per persistence port.
#[derive(Clone)]
pub struct Repositories {
    pub inventory: Arc<dyn InventoryRepository>,
    pub loans: Arc<dyn LoanRepository>,
    pub borrowers: Arc<dyn BorrowerRepository>,
    pub movements: Arc<dyn MovementRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            inventory: Arc::new(InMemoryInventoryRepository::new()),
            loans: Arc::new(InMemoryLoanRepository::new()),
            borrowers: Arc::new(InMemoryBorrowerRepository::new()),
            movements: Arc::new(InMemoryMovementRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            inventory: Arc::new(PostgresInventoryRepository::new(pool.clone())),
            loans: Arc::new(PostgresLoanRepository::new(pool.clone())),
            borrowers: Arc::new(PostgresBorrowerRepository::new(pool.clone())),
            movements: Arc::new(PostgresMovementRepository::new(pool)),
        }
    }
}

/// The assembled engine. Services share one lock table and one bus.
#[derive(Clone)]
pub struct Stowage {
    pub inventory: InventoryService,
    pub loans: LoanService,
    pub borrowers: BorrowerService,
    bus: Arc<InMemoryEventBus<JsonEnvelope>>,
}

impl Stowage {
    pub fn from_repositories(repos: Repositories) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let publisher = EventPublisher::new(bus.clone());
        let locks = Arc::new(UnitLocks::new());
        let movements = MovementRecorder::new(repos.movements);

        Self {
            inventory: InventoryService::new(
                repos.inventory.clone(),
                movements.clone(),
                publisher.clone(),
                locks.clone(),
            ),
            loans: LoanService::new(
                repos.loans,
                repos.inventory,
                repos.borrowers.clone(),
                movements,
                publisher,
                locks,
            ),
            borrowers: BorrowerService::new(repos.borrowers),
            bus,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_repositories(Repositories::in_memory())
    }

    /// Build for the configured backend. Postgres pools connect eagerly; the
    /// schema is expected to exist (see the `stowage-migrate` binary).
    pub async fn connect(config: &StowageConfig) -> anyhow::Result<Self> {
        match &config.store {
            StoreBackend::Memory => {
                tracing::info!(store = "memory", "using in-memory repositories");
                Ok(Self::in_memory())
            }
            StoreBackend::Postgres {
                database_url,
                max_connections,
            } => {
                let pool = connect_pool(database_url, *max_connections).await?;
                tracing::info!(store = "postgres", max_connections, "connected to postgres");
                Ok(Self::from_repositories(Repositories::postgres(pool)))
            }
        }
    }

    /// Receive every domain event published after this call.
    pub fn subscribe(&self) -> Subscription<JsonEnvelope> {
        self.bus.subscribe()
    }
}

pub async fn connect_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to postgres")
}
