use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clientele_core::ApiError;
use serde_json::Value;

/// Status and JSON payload every customer endpoint answers with.
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerOutcome {
    pub status: StatusCode,
    pub payload: Value,
}

impl HandlerOutcome {
    pub fn ok(payload: Value) -> Self {
        Self { status: StatusCode::OK, payload }
    }
}

impl From<ApiError> for HandlerOutcome {
    fn from(error: ApiError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, payload: error.body() }
    }
}

impl IntoResponse for HandlerOutcome {
    fn into_response(self) -> Response {
        (self.status, Json(self.payload)).into_response()
    }
}
