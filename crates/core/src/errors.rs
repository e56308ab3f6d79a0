use serde_json::{json, Value};
use thiserror::Error;

use crate::validation::ValidationIssue;

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Every failure a customer API handler can end in.
///
/// All variants are terminal: they are mapped to a status code and a JSON
/// body at the handler boundary and never retried.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("method `{method}` is not allowed")]
    MethodNotAllowed { method: String },
    #[error("request validation failed: {}", render_issues(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("data store call failed: {message}")]
    Store { message: String, payload: Value },
    #[error("unhandled failure: {0}")]
    Unhandled(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed { .. } => STATUS_METHOD_NOT_ALLOWED,
            Self::Validation(_) => STATUS_BAD_REQUEST,
            Self::Store { .. } | Self::Unhandled(_) => STATUS_INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body sent to the caller. Method and validation rejections answer
    /// with a bare `false`; failures carry the error object.
    pub fn body(&self) -> Value {
        match self {
            Self::MethodNotAllowed { .. } | Self::Validation(_) => Value::Bool(false),
            Self::Store { payload, .. } => payload.clone(),
            Self::Unhandled(message) => json!({ "message": message }),
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::Validation(_) => "validation",
            Self::Store { .. } => "store",
            Self::Unhandled(_) => "unhandled",
        }
    }
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
