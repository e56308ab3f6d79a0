use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use clientele_core::{
    ApiError, Customer, CustomerFilter, CustomerPatch, NewCustomer, Projection,
};

pub mod memory;
pub mod rest;
pub mod sql;

pub use memory::InMemoryCustomerStore;
pub use rest::RestCustomerStore;
pub use sql::SqlCustomerStore;

/// Error object reported by a hosted store, in PostgREST's shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl RemoteError {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: None, details: None, hint: None }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store rejected the request with status {status}: {}", .remote.message)]
    Rejected { status: u16, remote: RemoteError },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("store configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Rejected { .. } => "rejected",
            Self::Database(_) => "database",
            Self::Decode(_) => "decode",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Error object handed back to API callers.
    ///
    /// Errors reported by the remote store pass through untouched; local
    /// failures are rendered in the same `{message, code, details, hint}` shape.
    pub fn payload(&self) -> Value {
        match self {
            Self::Rejected { remote, .. } => json!(remote),
            other => json!({
                "message": other.to_string(),
                "code": other.error_class(),
                "details": null,
                "hint": null,
            }),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Store { message: error.to_string(), payload: error.payload() }
    }
}

/// The data store client consumed by the customer API.
///
/// Every call is a single fallible round trip: no retries, no transactions
/// and no ordering guarantee across calls.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn select(&self, projection: &Projection) -> Result<Vec<Customer>, StoreError>;

    async fn insert(&self, record: &NewCustomer) -> Result<Vec<Customer>, StoreError>;

    async fn update(
        &self,
        filter: &CustomerFilter,
        patch: &CustomerPatch,
    ) -> Result<Vec<Customer>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
