use std::sync::Arc;

use axum::Router;
use clientele_core::config::{AppConfig, ConfigError};
use clientele_store::{open_store, CustomerStore, StoreError};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn CustomerStore>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("customer store could not be opened: {0}")]
    Store(#[source] StoreError),
}

impl Application {
    /// Customer API plus `/health`, sharing one store handle.
    pub fn router(&self) -> Router {
        api::router(Arc::clone(&self.store))
            .merge(health::router(Arc::clone(&self.store)))
            .layer(TraceLayer::new_for_http())
    }
}

/// Loads configuration and opens the store in one step.
#[cfg(test)]
pub async fn bootstrap(
    options: clientele_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        backend = config.store.backend.as_str(),
        "starting application bootstrap"
    );

    let store = open_store(&config.store).await.map_err(BootstrapError::Store)?;
    info!(
        event_name = "system.bootstrap.store_ready",
        backend = store.backend_name(),
        table = %config.store.table,
        "customer store ready"
    );

    Ok(Application { config, store })
}
