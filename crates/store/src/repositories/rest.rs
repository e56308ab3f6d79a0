//! Hosted relational store reached over a PostgREST-compatible HTTP API.
//!
//! Rows are addressed as `{base_url}/rest/v1/{table}`. Writes ask for the
//! affected rows back (`Prefer: return=representation`) so the API can hand
//! them to its caller unchanged.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use clientele_core::{Customer, CustomerFilter, CustomerPatch, NewCustomer, Projection};

use super::{CustomerStore, RemoteError, StoreError};

const RETURN_REPRESENTATION: &str = "return=representation";

pub struct RestCustomerStore {
    client: Client,
    endpoint: String,
    access_key: SecretString,
}

impl RestCustomerStore {
    pub fn new(
        base_url: &str,
        access_key: SecretString,
        table: &str,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, access_key, table))
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        access_key: SecretString,
        table: &str,
    ) -> Self {
        let endpoint = format!("{}/rest/v1/{table}", base_url.trim_end_matches('/'));
        Self { client, endpoint, access_key }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let key = self.access_key.expose_secret();
        self.client
            .request(method, &self.endpoint)
            .header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
    }
}

#[async_trait::async_trait]
impl CustomerStore for RestCustomerStore {
    fn backend_name(&self) -> &'static str {
        "rest"
    }

    async fn select(&self, projection: &Projection) -> Result<Vec<Customer>, StoreError> {
        let select = projection.select_clause();
        debug!(endpoint = %self.endpoint, select = %select, "selecting customers");
        let response = self.request(Method::GET).query(&[("select", select)]).send().await?;
        read_rows(response).await
    }

    async fn insert(&self, record: &NewCustomer) -> Result<Vec<Customer>, StoreError> {
        let response = self
            .request(Method::POST)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(record)
            .send()
            .await?;
        read_rows(response).await
    }

    async fn update(
        &self,
        filter: &CustomerFilter,
        patch: &CustomerPatch,
    ) -> Result<Vec<Customer>, StoreError> {
        let response = self
            .request(Method::PATCH)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("id", format!("eq.{}", filter.id))])
            .json(patch)
            .send()
            .await?;
        read_rows(response).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response =
            self.request(Method::GET).query(&[("select", "id"), ("limit", "1")]).send().await?;
        read_rows(response).await.map(|_| ())
    }
}

async fn read_rows(response: Response) -> Result<Vec<Customer>, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        let remote = serde_json::from_str::<RemoteError>(&body).unwrap_or_else(|_| {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("store request failed").to_string()
            } else {
                body
            };
            RemoteError::from_message(message)
        });
        return Err(StoreError::Rejected { status: status.as_u16(), remote });
    }

    let body = response.text().await?;
    serde_json::from_str::<Vec<Customer>>(&body)
        .map_err(|error| StoreError::Decode(format!("unexpected customer rows: {error}")))
}
