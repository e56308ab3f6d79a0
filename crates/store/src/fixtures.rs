use clientele_core::{Customer, NewCustomer, Projection};

use crate::repositories::{CustomerStore, StoreError};

/// Demo rows shown in the customer table out of the box.
pub fn demo_customers() -> Vec<NewCustomer> {
    vec![
        NewCustomer {
            name: Some("June Bean".to_string()),
            email: Some("jbee@email.com".to_string()),
        },
        NewCustomer {
            name: Some("Juan Mata".to_string()),
            email: Some("best@email.com".to_string()),
        },
    ]
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: Vec<Customer>,
    pub skipped: Vec<String>,
}

/// Inserts every demo customer whose email is not already present.
pub async fn seed_demo_customers(store: &dyn CustomerStore) -> Result<SeedResult, StoreError> {
    let existing = store.select(&Projection::summary()).await?;
    let mut result = SeedResult::default();

    for record in demo_customers() {
        let email = record.email.clone().unwrap_or_default();
        let present =
            existing.iter().any(|customer| customer.email.as_deref() == Some(email.as_str()));
        if present {
            result.skipped.push(email);
            continue;
        }
        result.inserted.extend(store.insert(&record).await?);
    }

    Ok(result)
}
