//! Customer endpoints.
//!
//! Each handler runs the same pipeline: method gate, body decode,
//! validation, then exactly one store call. Every path ends in a
//! [`HandlerOutcome`]; panics are turned into a 500 by the catch-panic layer.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use clientele_core::validation::{decode_body, parse_customer_update, parse_new_customer};
use clientele_core::{ApiError, Customer, Projection};
use clientele_store::CustomerStore;
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};

use crate::outcome::HandlerOutcome;

pub const LOAD_CUSTOMERS_PATH: &str = "/api/load-customers";
pub const ADD_NEW_CUSTOMER_PATH: &str = "/api/add-new-customer";
pub const UPDATE_CUSTOMER_DETAILS_PATH: &str = "/api/update-customer-details";

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct ApiState {
    store: Arc<dyn CustomerStore>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endpoint {
    Load,
    Create,
    Update,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Self::Load => LOAD_CUSTOMERS_PATH,
            Self::Create => ADD_NEW_CUSTOMER_PATH,
            Self::Update => UPDATE_CUSTOMER_DETAILS_PATH,
        }
    }

    fn allowed_method(self) -> Method {
        match self {
            Self::Load => Method::GET,
            Self::Create | Self::Update => Method::POST,
        }
    }
}

pub fn router(store: Arc<dyn CustomerStore>) -> Router {
    Router::new()
        .route(LOAD_CUSTOMERS_PATH, any(load_customers))
        .route(ADD_NEW_CUSTOMER_PATH, any(add_new_customer))
        .route(UPDATE_CUSTOMER_DETAILS_PATH, any(update_customer_details))
        .with_state(ApiState { store })
        .layer(CatchPanicLayer::custom(panic_response))
}

pub async fn load_customers(State(state): State<ApiState>, method: Method) -> HandlerOutcome {
    let result = async {
        gate(Endpoint::Load, &method)?;
        rows_payload(state.store.select(&Projection::summary()).await?)
    }
    .await;
    finish(Endpoint::Load, result)
}

pub async fn add_new_customer(State(state): State<ApiState>, request: Request) -> HandlerOutcome {
    let result = async {
        gate(Endpoint::Create, request.method())?;
        let body = read_body(request).await?;
        let record = parse_new_customer(&body).into_result().map_err(ApiError::Validation)?;
        rows_payload(state.store.insert(&record).await?)
    }
    .await;
    finish(Endpoint::Create, result)
}

pub async fn update_customer_details(
    State(state): State<ApiState>,
    request: Request,
) -> HandlerOutcome {
    let result = async {
        gate(Endpoint::Update, request.method())?;
        let body = read_body(request).await?;
        let update = parse_customer_update(&body).into_result().map_err(ApiError::Validation)?;
        rows_payload(state.store.update(&update.filter(), &update.patch).await?)
    }
    .await;
    finish(Endpoint::Update, result)
}

fn gate(endpoint: Endpoint, method: &Method) -> Result<(), ApiError> {
    if *method == endpoint.allowed_method() {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed { method: method.to_string() })
    }
}

async fn read_body(request: Request) -> Result<Value, ApiError> {
    let raw = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|error| ApiError::Unhandled(format!("failed to read request body: {error}")))?;
    decode_body(&raw).map_err(|issue| ApiError::Validation(vec![issue]))
}

fn rows_payload(rows: Vec<Customer>) -> Result<Value, ApiError> {
    serde_json::to_value(rows).map_err(|error| ApiError::Unhandled(error.to_string()))
}

fn finish(endpoint: Endpoint, result: Result<Value, ApiError>) -> HandlerOutcome {
    let path = endpoint.path();
    match result {
        Ok(payload) => {
            let rows = payload.as_array().map_or(0, Vec::len);
            let event_name = match endpoint {
                Endpoint::Load => "api.customers.loaded",
                Endpoint::Create => "api.customers.created",
                Endpoint::Update => "api.customers.updated",
            };
            info!(event_name, path, rows, "customer request completed");
            HandlerOutcome::ok(payload)
        }
        Err(error) => {
            match &error {
                ApiError::MethodNotAllowed { method } => warn!(
                    event_name = "api.customers.method_rejected",
                    path,
                    method = %method,
                    "request method not allowed"
                ),
                ApiError::Validation(_) => warn!(
                    event_name = "api.customers.validation_failed",
                    path,
                    reason = %error,
                    "request body failed validation"
                ),
                ApiError::Store { message, .. } => error!(
                    event_name = "api.customers.store_failed",
                    path,
                    error = %message,
                    "data store call failed"
                ),
                ApiError::Unhandled(message) => error!(
                    event_name = "api.customers.unhandled",
                    path,
                    error = %message,
                    "customer request failed"
                ),
            }
            HandlerOutcome::from(error)
        }
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    };
    error!(event_name = "api.customers.panicked", error = %message, "customer handler panicked");
    HandlerOutcome::from(ApiError::Unhandled(message)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use clientele_core::{
        Customer, CustomerFilter, CustomerId, CustomerPatch, NewCustomer, Projection,
    };
    use clientele_store::{CustomerStore, RemoteError, StoreError};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{
        router, ADD_NEW_CUSTOMER_PATH, LOAD_CUSTOMERS_PATH, MAX_BODY_BYTES,
        UPDATE_CUSTOMER_DETAILS_PATH,
    };

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Select(Projection),
        Insert(NewCustomer),
        Update(CustomerFilter, CustomerPatch),
    }

    #[derive(Default)]
    struct ScriptedStore {
        rows: Vec<Customer>,
        failure: Option<RemoteError>,
        panics: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedStore {
        fn answering(rows: Vec<Customer>) -> Arc<Self> {
            Arc::new(Self { rows, ..Self::default() })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                failure: Some(RemoteError {
                    message: message.to_string(),
                    code: Some("PGRST301".to_string()),
                    details: None,
                    hint: None,
                }),
                ..Self::default()
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().expect("call log").clone()
        }

        fn answer(&self, call: Call) -> Result<Vec<Customer>, StoreError> {
            self.calls.lock().expect("call log").push(call);
            if self.panics {
                panic!("store exploded");
            }
            match &self.failure {
                Some(remote) => Err(StoreError::Rejected { status: 401, remote: remote.clone() }),
                None => Ok(self.rows.clone()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CustomerStore for ScriptedStore {
        fn backend_name(&self) -> &'static str {
            "scripted"
        }

        async fn select(&self, projection: &Projection) -> Result<Vec<Customer>, StoreError> {
            self.answer(Call::Select(projection.clone()))
        }

        async fn insert(&self, record: &NewCustomer) -> Result<Vec<Customer>, StoreError> {
            self.answer(Call::Insert(record.clone()))
        }

        async fn update(
            &self,
            filter: &CustomerFilter,
            patch: &CustomerPatch,
        ) -> Result<Vec<Customer>, StoreError> {
            self.answer(Call::Update(filter.clone(), patch.clone()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn june() -> Customer {
        Customer {
            id: CustomerId::new("1"),
            name: Some("June Bean".to_string()),
            email: Some("jbee@email.com".to_string()),
            created_at: None,
            extra: Default::default(),
        }
    }

    async fn send(app: Router, method: Method, path: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build");
        let response = app.oneshot(request).await.expect("router should answer");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
        (status, serde_json::from_slice(&bytes).expect("response should be JSON"))
    }

    #[tokio::test]
    async fn wrong_methods_are_rejected_with_false_before_the_store_is_touched() {
        let cases = [
            (Method::POST, LOAD_CUSTOMERS_PATH),
            (Method::DELETE, LOAD_CUSTOMERS_PATH),
            (Method::GET, ADD_NEW_CUSTOMER_PATH),
            (Method::PUT, ADD_NEW_CUSTOMER_PATH),
            (Method::GET, UPDATE_CUSTOMER_DETAILS_PATH),
            (Method::PATCH, UPDATE_CUSTOMER_DETAILS_PATH),
        ];

        for (method, path) in cases {
            let store = ScriptedStore::answering(vec![june()]);
            let (status, body) = send(router(store.clone()), method.clone(), path, "{}").await;

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {path}");
            assert_eq!(body, Value::Bool(false), "{method} {path}");
            assert!(store.calls().is_empty(), "{method} {path} should not reach the store");
        }
    }

    #[tokio::test]
    async fn loader_returns_store_rows_unchanged() {
        let store = ScriptedStore::answering(vec![june()]);

        let (status, body) =
            send(router(store.clone()), Method::GET, LOAD_CUSTOMERS_PATH, "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": "1", "name": "June Bean", "email": "jbee@email.com"}]));
        assert_eq!(store.calls(), vec![Call::Select(Projection::summary())]);
    }

    #[tokio::test]
    async fn loader_returns_an_empty_list() {
        let store = ScriptedStore::answering(Vec::new());

        let (status, body) = send(router(store), Method::GET, LOAD_CUSTOMERS_PATH, "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn store_errors_surface_as_500_with_the_error_object() {
        let expected = json!({
            "message": "JWT expired",
            "code": "PGRST301",
            "details": null,
            "hint": null,
        });
        let cases = [
            (Method::GET, LOAD_CUSTOMERS_PATH, ""),
            (Method::POST, ADD_NEW_CUSTOMER_PATH, r#"{"name":"June Bean"}"#),
            (Method::POST, UPDATE_CUSTOMER_DETAILS_PATH, r#"{"id":"1","name":"A"}"#),
        ];

        for (method, path, body) in cases {
            let store = ScriptedStore::failing("JWT expired");
            let (status, payload) = send(router(store), method, path, body).await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{path}");
            assert_eq!(payload, expected, "{path}");
        }
    }

    #[tokio::test]
    async fn creator_accepts_an_empty_object() {
        let store = ScriptedStore::answering(vec![Customer {
            id: CustomerId::new("7"),
            name: None,
            email: None,
            created_at: None,
            extra: Default::default(),
        }]);

        let (status, body) =
            send(router(store.clone()), Method::POST, ADD_NEW_CUSTOMER_PATH, "{}").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": "7", "name": null, "email": null}]));
        assert_eq!(store.calls(), vec![Call::Insert(NewCustomer::default())]);
    }

    #[tokio::test]
    async fn creator_treats_an_empty_body_as_an_empty_object() {
        let store = ScriptedStore::answering(Vec::new());

        let (status, _) =
            send(router(store.clone()), Method::POST, ADD_NEW_CUSTOMER_PATH, "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.calls(), vec![Call::Insert(NewCustomer::default())]);
    }

    #[tokio::test]
    async fn creator_forwards_only_known_fields() {
        let store = ScriptedStore::answering(vec![june()]);

        let (status, body) = send(
            router(store.clone()),
            Method::POST,
            ADD_NEW_CUSTOMER_PATH,
            r#"{"name":"June Bean","email":"jbee@email.com","id":"forged"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": "1", "name": "June Bean", "email": "jbee@email.com"}]));
        assert_eq!(
            store.calls(),
            vec![Call::Insert(NewCustomer {
                name: Some("June Bean".to_string()),
                email: Some("jbee@email.com".to_string()),
            })]
        );
    }

    #[tokio::test]
    async fn creator_rejects_invalid_bodies_without_calling_the_store() {
        for body in [r#"{"email":"not-an-email"}"#, r#"{"name":null}"#, "[1,2]", "{name:"] {
            let store = ScriptedStore::answering(vec![june()]);

            let (status, payload) =
                send(router(store.clone()), Method::POST, ADD_NEW_CUSTOMER_PATH, body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(payload, Value::Bool(false), "{body}");
            assert!(store.calls().is_empty(), "{body} should not reach the store");
        }
    }

    #[tokio::test]
    async fn oversized_bodies_end_as_500_without_calling_the_store() {
        let body = format!(r#"{{"name":"{}"}}"#, "a".repeat(MAX_BODY_BYTES));
        let store = ScriptedStore::answering(vec![june()]);

        let (status, payload) =
            send(router(store.clone()), Method::POST, ADD_NEW_CUSTOMER_PATH, &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = payload["message"].as_str().expect("error message");
        assert!(message.starts_with("failed to read request body"), "{message}");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn updater_rejects_missing_id_and_bad_email() {
        for body in [r#"{"name":"A"}"#, r#"{"id":"1","email":"bad"}"#, r#"{"id":""}"#] {
            let store = ScriptedStore::answering(vec![june()]);

            let (status, payload) =
                send(router(store.clone()), Method::POST, UPDATE_CUSTOMER_DETAILS_PATH, body)
                    .await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(payload, Value::Bool(false), "{body}");
            assert!(store.calls().is_empty(), "{body} should not reach the store");
        }
    }

    #[tokio::test]
    async fn updater_patches_by_id_and_returns_store_rows() {
        let updated = Customer {
            id: CustomerId::new("1"),
            name: Some("A".to_string()),
            email: Some("a@b.com".to_string()),
            created_at: None,
            extra: Default::default(),
        };
        let store = ScriptedStore::answering(vec![updated]);

        let (status, body) = send(
            router(store.clone()),
            Method::POST,
            UPDATE_CUSTOMER_DETAILS_PATH,
            r#"{"id":"1","name":"A","email":"a@b.com"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": "1", "name": "A", "email": "a@b.com"}]));
        assert_eq!(
            store.calls(),
            vec![Call::Update(
                CustomerFilter::by_id(CustomerId::new("1")),
                CustomerPatch {
                    name: Some(Some("A".to_string())),
                    email: Some(Some("a@b.com".to_string())),
                },
            )]
        );
    }

    #[tokio::test]
    async fn updater_distinguishes_null_from_omitted_fields() {
        let store = ScriptedStore::answering(Vec::new());

        let (status, body) = send(
            router(store.clone()),
            Method::POST,
            UPDATE_CUSTOMER_DETAILS_PATH,
            r#"{"id":"1","email":null}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        assert_eq!(
            store.calls(),
            vec![Call::Update(
                CustomerFilter::by_id(CustomerId::new("1")),
                CustomerPatch { name: None, email: Some(None) },
            )]
        );
    }

    #[tokio::test]
    async fn repeated_updates_give_the_same_answer() {
        let store = ScriptedStore::answering(vec![june()]);
        let app = router(store.clone());
        let body = r#"{"id":"1","name":"June Bean","email":"jbee@email.com"}"#;

        let first = send(app.clone(), Method::POST, UPDATE_CUSTOMER_DETAILS_PATH, body).await;
        let second = send(app, Method::POST, UPDATE_CUSTOMER_DETAILS_PATH, body).await;

        assert_eq!(first.0, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn panicking_store_is_reported_as_500() {
        let store = Arc::new(ScriptedStore { panics: true, ..ScriptedStore::default() });

        let (status, body) = send(router(store), Method::GET, LOAD_CUSTOMERS_PATH, "").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "store exploded"}));
    }
}
