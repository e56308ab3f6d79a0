//! Parse-and-validate step for customer request bodies.
//!
//! Bodies arrive as untyped JSON. Each parser either produces the typed
//! payload or the full list of issues found, so callers can log or assert
//! on the exact reasons while the HTTP boundary still answers with `false`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::customer::{CustomerId, CustomerPatch, CustomerUpdate, NewCustomer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(Vec<ValidationIssue>),
}

impl<T> Validation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid(issues) => issues,
        }
    }

    pub fn into_result(self) -> Result<T, Vec<ValidationIssue>> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(issues) => Err(issues),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    MalformedBody,
    NotAnObject,
    Required,
    NotAString,
    NotNullable,
    InvalidEmail,
}

impl IssueReason {
    fn describe(&self) -> &'static str {
        match self {
            Self::MalformedBody => "is not valid JSON",
            Self::NotAnObject => "must be a JSON object",
            Self::Required => "is required",
            Self::NotAString => "must be a string",
            Self::NotNullable => "must not be null",
            Self::InvalidEmail => "must be a valid email address",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub reason: IssueReason,
}

impl ValidationIssue {
    pub fn new(field: &'static str, reason: IssueReason) -> Self {
        Self { field, reason }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.reason.describe())
    }
}

/// Decodes a raw request body. An empty body decodes to `null`, which the
/// parsers below treat as an empty object.
pub fn decode_body(raw: &[u8]) -> Result<Value, ValidationIssue> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw)
        .map_err(|_| ValidationIssue::new("body", IssueReason::MalformedBody))
}

/// Validates a create request: `name` and `email` are optional, non-null strings.
/// Any other field, `id` included, is dropped and never reaches the store.
pub fn parse_new_customer(body: &Value) -> Validation<NewCustomer> {
    let fields = match body_fields(body) {
        Ok(fields) => fields,
        Err(issue) => return Validation::Invalid(vec![issue]),
    };

    let mut issues = Vec::new();
    let name = read_string(fields, "name", Nullability::Rejected, &mut issues).flatten();
    let email = read_string(fields, "email", Nullability::Rejected, &mut issues).flatten();
    check_email("email", email.as_deref(), &mut issues);

    if issues.is_empty() {
        Validation::Valid(NewCustomer { name, email })
    } else {
        Validation::Invalid(issues)
    }
}

/// Validates an update request: `id` is required, `name` and `email` are nullable.
pub fn parse_customer_update(body: &Value) -> Validation<CustomerUpdate> {
    let fields = match body_fields(body) {
        Ok(fields) => fields,
        Err(issue) => return Validation::Invalid(vec![issue]),
    };

    let mut issues = Vec::new();
    let id = match fields.get("id") {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new("id", IssueReason::Required));
            None
        }
        Some(Value::String(value)) if value.is_empty() => {
            issues.push(ValidationIssue::new("id", IssueReason::Required));
            None
        }
        Some(Value::String(value)) => Some(CustomerId::new(value.clone())),
        Some(_) => {
            issues.push(ValidationIssue::new("id", IssueReason::NotAString));
            None
        }
    };
    let name = read_string(fields, "name", Nullability::Allowed, &mut issues);
    let email = read_string(fields, "email", Nullability::Allowed, &mut issues);
    check_email("email", email.clone().flatten().as_deref(), &mut issues);

    match id {
        Some(id) if issues.is_empty() => {
            Validation::Valid(CustomerUpdate { id, patch: CustomerPatch { name, email } })
        }
        _ => Validation::Invalid(issues),
    }
}

/// Email grammar check. The empty string is treated as "no email" by callers
/// and is not passed here.
pub fn is_valid_email(candidate: &str) -> bool {
    email_pattern().is_match(candidate)
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        const UNICODE: &str = r"\u{00A0}-\u{D7FF}\u{F900}-\u{FDCF}\u{FDF0}-\u{FFEF}";
        let atom = format!(r"[a-z0-9!#$%&'*+/=?^_`{{|}}~\-{UNICODE}]+");
        let label = format!(r"[a-z0-9{UNICODE}](?:[a-z0-9\-._~{UNICODE}]*[a-z0-9{UNICODE}])?");
        let top = format!(r"[a-z{UNICODE}](?:[a-z0-9\-._~{UNICODE}]*[a-z{UNICODE}])?");
        let pattern = format!(r"(?i)^{atom}(?:\.{atom})*@(?:{label}\.)+{top}$");
        Regex::new(&pattern).expect("email pattern should compile")
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Nullability {
    Allowed,
    Rejected,
}

fn body_fields(body: &Value) -> Result<&Map<String, Value>, ValidationIssue> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    match body {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(EMPTY.get_or_init(Map::new)),
        _ => Err(ValidationIssue::new("body", IssueReason::NotAnObject)),
    }
}

/// `None` when absent, `Some(None)` for an accepted null, `Some(Some(_))` for a string.
fn read_string(
    fields: &Map<String, Value>,
    field: &'static str,
    nullability: Nullability,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Option<String>> {
    match fields.get(field) {
        None => None,
        Some(Value::Null) if nullability == Nullability::Allowed => Some(None),
        Some(Value::Null) => {
            issues.push(ValidationIssue::new(field, IssueReason::NotNullable));
            None
        }
        Some(Value::String(value)) => Some(Some(value.clone())),
        Some(_) => {
            issues.push(ValidationIssue::new(field, IssueReason::NotAString));
            None
        }
    }
}

fn check_email(field: &'static str, email: Option<&str>, issues: &mut Vec<ValidationIssue>) {
    if let Some(email) = email {
        if !email.is_empty() && !is_valid_email(email) {
            issues.push(ValidationIssue::new(field, IssueReason::InvalidEmail));
        }
    }
}
