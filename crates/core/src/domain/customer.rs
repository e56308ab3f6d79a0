use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Store-assigned customer identifier.
///
/// Hosted stores may hand back numeric keys; those are normalized to their
/// decimal string form so the identifier is always a string on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CustomerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(value) => Self(value),
            RawId::Signed(value) => Self(value.to_string()),
            RawId::Unsigned(value) => Self(value.to_string()),
        })
    }
}

/// A stored customer row.
///
/// Columns beyond the known ones are kept in `extra` and written back out
/// unchanged, so hosted rows reach the caller as the store sent them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reads RFC 3339 timestamps, treats offset-free ones as UTC and maps
/// anything else to `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Value::String(raw)) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(parse_timestamp(&raw))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Fields accepted when creating a customer. Absent fields are not sent to the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Column patch for an update.
///
/// `None` leaves the column untouched, `Some(None)` writes null and
/// `Some(Some(value))` writes the value, empty strings included.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }

    pub fn apply_to(&self, customer: &mut Customer) {
        if let Some(name) = &self.name {
            customer.name = name.clone();
        }
        if let Some(email) = &self.email {
            customer.email = email.clone();
        }
    }
}

/// Row selector for updates. Customers are only ever matched by identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerFilter {
    pub id: CustomerId,
}

impl CustomerFilter {
    pub fn by_id(id: CustomerId) -> Self {
        Self { id }
    }

    pub fn matches(&self, customer: &Customer) -> bool {
        self.id == customer.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub id: CustomerId,
    pub patch: CustomerPatch,
}

impl CustomerUpdate {
    pub fn filter(&self) -> CustomerFilter {
        CustomerFilter::by_id(self.id.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CustomerColumn {
    Id,
    Name,
    Email,
    CreatedAt,
}

impl CustomerColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Columns requested from a read. The identifier is always part of the projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<CustomerColumn>,
}

impl Projection {
    pub fn new(columns: impl IntoIterator<Item = CustomerColumn>) -> Self {
        let mut projected = vec![CustomerColumn::Id];
        for column in columns {
            if !projected.contains(&column) {
                projected.push(column);
            }
        }
        Self { columns: projected }
    }

    /// The `id, name, email` listing used by the customer table.
    pub fn summary() -> Self {
        Self::new([CustomerColumn::Name, CustomerColumn::Email])
    }

    pub fn all() -> Self {
        Self::new([CustomerColumn::Name, CustomerColumn::Email, CustomerColumn::CreatedAt])
    }

    pub fn columns(&self) -> &[CustomerColumn] {
        &self.columns
    }

    pub fn includes(&self, column: CustomerColumn) -> bool {
        self.columns.contains(&column)
    }

    pub fn select_clause(&self) -> String {
        self.columns.iter().map(CustomerColumn::as_str).collect::<Vec<_>>().join(",")
    }

    /// Drops every field the projection does not cover.
    pub fn apply(&self, mut customer: Customer) -> Customer {
        if !self.includes(CustomerColumn::Name) {
            customer.name = None;
        }
        if !self.includes(CustomerColumn::Email) {
            customer.email = None;
        }
        if !self.includes(CustomerColumn::CreatedAt) {
            customer.created_at = None;
        }
        customer
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Customer, CustomerColumn, CustomerId, CustomerPatch, NewCustomer, Projection};

    #[test]
    fn numeric_store_ids_normalize_to_strings() {
        let customer: Customer =
            serde_json::from_value(json!({"id": 42, "name": "June Bean", "email": null}))
                .expect("customer should decode");

        assert_eq!(customer.id, CustomerId::new("42"));
        assert_eq!(serde_json::to_value(&customer.id).expect("encode"), json!("42"));
    }

    #[test]
    fn summary_projection_omits_created_at_from_rows() {
        let customer = Customer {
            id: CustomerId::new("1"),
            name: Some("June Bean".to_string()),
            email: Some("jbee@email.com".to_string()),
            created_at: Some(chrono::Utc::now()),
            extra: Default::default(),
        };

        let projected = Projection::summary().apply(customer);

        assert_eq!(
            serde_json::to_value(projected).expect("encode"),
            json!({"id": "1", "name": "June Bean", "email": "jbee@email.com"})
        );
        assert_eq!(Projection::summary().select_clause(), "id,name,email");
    }

    #[test]
    fn projection_always_keeps_identifier_first() {
        let projection = Projection::new([CustomerColumn::Email, CustomerColumn::Id]);
        assert_eq!(projection.columns(), &[CustomerColumn::Id, CustomerColumn::Email]);
    }

    #[test]
    fn patch_distinguishes_omitted_from_cleared_fields() {
        let patch = CustomerPatch { name: Some(None), email: None };
        assert_eq!(serde_json::to_value(&patch).expect("encode"), json!({"name": null}));

        let mut customer = Customer {
            id: CustomerId::new("1"),
            name: Some("June Bean".to_string()),
            email: Some("jbee@email.com".to_string()),
            created_at: None,
            extra: Default::default(),
        };
        patch.apply_to(&mut customer);

        assert_eq!(customer.name, None);
        assert_eq!(customer.email.as_deref(), Some("jbee@email.com"));
    }

    #[test]
    fn hosted_rows_keep_unknown_columns_and_offset_free_timestamps() {
        let customer: Customer = serde_json::from_value(json!({
            "id": "7",
            "name": "A",
            "email": null,
            "created_at": "2024-01-01T00:00:00.123456",
            "phone": "555"
        }))
        .expect("customer should decode");

        let expected = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_micro_opt(0, 0, 0, 123_456))
            .map(|naive| naive.and_utc());
        assert_eq!(customer.created_at, expected);
        assert_eq!(customer.extra.get("phone"), Some(&json!("555")));

        let encoded = serde_json::to_value(&customer).expect("encode");
        assert_eq!(encoded["phone"], json!("555"));
        assert_eq!(encoded["name"], json!("A"));
    }

    #[test]
    fn unreadable_timestamps_decode_as_missing() {
        let customer: Customer = serde_json::from_value(json!({
            "id": "7",
            "created_at": "last tuesday"
        }))
        .expect("customer should decode");

        assert_eq!(customer.created_at, None);
        assert!(customer.extra.is_empty());
    }

    #[test]
    fn new_customer_skips_absent_fields_on_the_wire() {
        let record = NewCustomer { name: Some("Juan Mata".to_string()), email: None };
        assert_eq!(serde_json::to_value(record).expect("encode"), json!({"name": "Juan Mata"}));
    }
}
