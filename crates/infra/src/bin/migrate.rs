//! Apply the stowage schema to the database named by `DATABASE_URL`.

use anyhow::{Context, bail};

use stowage_infra::config::{StoreBackend, StowageConfig};
use stowage_infra::repository::PostgresSchema;
use stowage_infra::stowage::connect_pool;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    stowage_observability::init();

    let config = StowageConfig::from_env().context("invalid configuration")?;
    let StoreBackend::Postgres {
        database_url,
        max_connections,
    } = config.store
    else {
        bail!("STOWAGE_STORE=postgres is required to run migrations");
    };

    let pool = connect_pool(&database_url, max_connections).await?;
    PostgresSchema::apply(&pool)
        .await
        .context("failed to apply schema")?;

    tracing::info!("schema applied");
    Ok(())
}
