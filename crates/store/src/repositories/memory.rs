use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use clientele_core::{Customer, CustomerFilter, CustomerId, CustomerPatch, NewCustomer, Projection};

use super::{CustomerStore, StoreError};

/// Insertion-ordered customer table kept in process memory.
#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<Vec<Customer>>,
}

impl InMemoryCustomerStore {
    pub fn with_customers(customers: Vec<Customer>) -> Self {
        Self { customers: RwLock::new(customers) }
    }

    pub async fn snapshot(&self) -> Vec<Customer> {
        self.customers.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CustomerStore for InMemoryCustomerStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, projection: &Projection) -> Result<Vec<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers.iter().cloned().map(|customer| projection.apply(customer)).collect())
    }

    async fn insert(&self, record: &NewCustomer) -> Result<Vec<Customer>, StoreError> {
        let customer = Customer {
            id: CustomerId::new(Uuid::new_v4().to_string()),
            name: record.name.clone(),
            email: record.email.clone(),
            created_at: Some(Utc::now()),
            extra: Default::default(),
        };

        let mut customers = self.customers.write().await;
        customers.push(customer.clone());
        Ok(vec![customer])
    }

    async fn update(
        &self,
        filter: &CustomerFilter,
        patch: &CustomerPatch,
    ) -> Result<Vec<Customer>, StoreError> {
        let mut customers = self.customers.write().await;
        let updated = customers
            .iter_mut()
            .filter(|customer| filter.matches(customer))
            .map(|customer| {
                patch.apply_to(customer);
                customer.clone()
            })
            .collect();
        Ok(updated)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
