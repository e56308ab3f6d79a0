pub mod connection;
pub mod fixtures;
pub mod repositories;
pub mod schema;

use std::sync::Arc;
use std::time::Duration;

use clientele_core::config::{StoreBackend, StoreConfig};
use tracing::info;

pub use connection::{connect_with_settings, DbPool};
pub use fixtures::{demo_customers, seed_demo_customers, SeedResult};
pub use repositories::{
    CustomerStore, InMemoryCustomerStore, RemoteError, RestCustomerStore, SqlCustomerStore,
    StoreError,
};

/// Opens the backend selected by configuration. SQLite tables are created on first use.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CustomerStore>, StoreError> {
    let store: Arc<dyn CustomerStore> = match config.backend {
        StoreBackend::Rest => Arc::new(RestCustomerStore::new(
            &config.url,
            config.access_key.clone(),
            &config.table,
            Duration::from_secs(config.timeout_secs),
        )?),
        StoreBackend::Sqlite => {
            let pool =
                connect_with_settings(&config.url, config.max_connections, config.timeout_secs)
                    .await?;
            if schema::ensure_schema(&pool, &config.table).await? {
                info!(
                    event_name = "store.schema.created",
                    table = %config.table,
                    "customer table created"
                );
            }
            Arc::new(SqlCustomerStore::new(pool, &config.table)?)
        }
        StoreBackend::Memory => Arc::new(InMemoryCustomerStore::default()),
    };

    info!(
        event_name = "store.opened",
        backend = store.backend_name(),
        table = %config.table,
        "customer store opened"
    );
    Ok(store)
}
