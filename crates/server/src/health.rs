use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use clientele_store::CustomerStore;
use serde::Serialize;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<dyn CustomerStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(store: Arc<dyn CustomerStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = store_check(state.store.as_ref()).await;
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "clientele-server accepting requests".to_string(),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(store: &dyn CustomerStore) -> HealthCheck {
    let backend = store.backend_name();
    match store.ping().await {
        Ok(()) => HealthCheck { status: "ready", detail: format!("{backend} store answered") },
        Err(error) => {
            warn!(
                event_name = "system.health.store_unreachable",
                backend,
                error = %error,
                "store ping failed"
            );
            HealthCheck {
                status: "degraded",
                detail: format!("{backend} store ping failed: {error}"),
            }
        }
    }
}
