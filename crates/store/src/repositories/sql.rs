use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use clientele_core::{
    Customer, CustomerColumn, CustomerFilter, CustomerId, CustomerPatch, NewCustomer, Projection,
};

use super::{CustomerStore, StoreError};
use crate::schema::checked_table_name;
use crate::DbPool;

const RETURNING: &str = "RETURNING id, name, email, created_at";

pub struct SqlCustomerStore {
    pool: DbPool,
    table: String,
}

impl SqlCustomerStore {
    pub fn new(pool: DbPool, table: &str) -> Result<Self, StoreError> {
        Ok(Self { pool, table: checked_table_name(table)?.to_string() })
    }
}

#[async_trait::async_trait]
impl CustomerStore for SqlCustomerStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn select(&self, projection: &Projection) -> Result<Vec<Customer>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at, rowid",
            projection.select_clause(),
            self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(|row| customer_from_row(row, projection)).collect()
    }

    async fn insert(&self, record: &NewCustomer) -> Result<Vec<Customer>, StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, name, email, created_at) VALUES (?, ?, ?, ?) {RETURNING}",
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(record.name.as_deref())
            .bind(record.email.as_deref())
            .bind(Utc::now())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| customer_from_row(row, &Projection::all())).collect()
    }

    async fn update(
        &self,
        filter: &CustomerFilter,
        patch: &CustomerPatch,
    ) -> Result<Vec<Customer>, StoreError> {
        let mut assignments = Vec::new();
        let mut values: Vec<Option<&str>> = Vec::new();
        if let Some(name) = &patch.name {
            assignments.push("name = ?");
            values.push(name.as_deref());
        }
        if let Some(email) = &patch.email {
            assignments.push("email = ?");
            values.push(email.as_deref());
        }

        let sql = if assignments.is_empty() {
            format!("SELECT id, name, email, created_at FROM {} WHERE id = ?", self.table)
        } else {
            format!(
                "UPDATE {} SET {} WHERE id = ? {RETURNING}",
                self.table,
                assignments.join(", ")
            )
        };

        let mut query = sqlx::query(&sql);
        for value in values {
            query = query.bind(value);
        }
        let rows = query.bind(filter.id.as_str()).fetch_all(&self.pool).await?;
        rows.iter().map(|row| customer_from_row(row, &Projection::all())).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

fn customer_from_row(row: &SqliteRow, projection: &Projection) -> Result<Customer, StoreError> {
    let id: String = row.try_get("id")?;
    if id.is_empty() {
        return Err(StoreError::Decode("customer row has an empty id".to_string()));
    }

    let name = if projection.includes(CustomerColumn::Name) { row.try_get("name")? } else { None };
    let email =
        if projection.includes(CustomerColumn::Email) { row.try_get("email")? } else { None };
    let created_at = if projection.includes(CustomerColumn::CreatedAt) {
        row.try_get::<Option<DateTime<Utc>>, _>("created_at")?
    } else {
        None
    };

    Ok(Customer { id: CustomerId::new(id), name, email, created_at, extra: Default::default() })
}
