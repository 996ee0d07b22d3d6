//! PostgreSQL adapter. Every mutation runs in its own transaction.

use super::{EntityStore, Record, StorageError};
use crate::descriptor::{FieldType, TypeDescriptor};
use crate::query::FilterPredicate;
use crate::serializer::Assignments;
use crate::sql::{self, bind_param, QueryBuf};
use crate::value::FieldValue;
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation()
                    || db.code().as_deref() == Some("23502") =>
            {
                StorageError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Unavailable(e.to_string())
            }
            _ => StorageError::Database(e),
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn prepare(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        q.params.iter().fold(sqlx::query(&q.sql), bind_param)
    }

    async fn fetch_optional_tx(&self, q: &QueryBuf) -> Result<Option<PgRow>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let row = Self::prepare(q).fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        Ok(row)
    }
}

fn row_to_record(entity: &TypeDescriptor, row: &PgRow) -> Result<Record, StorageError> {
    let mut record = Record::with_capacity(entity.fields().len());
    for field in entity.fields() {
        let name = field.name.as_str();
        let value = match field.field_type.storage_type() {
            FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(FieldValue::Int),
            FieldType::Float => row.try_get::<Option<f64>, _>(name)?.map(FieldValue::Float),
            FieldType::Decimal => row.try_get::<Option<String>, _>(name)?.map(FieldValue::Decimal),
            FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(FieldValue::Bool),
            FieldType::Timestamp => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)?
                .map(FieldValue::Timestamp),
            FieldType::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(name)?
                .map(FieldValue::Date),
            FieldType::Uuid => row.try_get::<Option<uuid::Uuid>, _>(name)?.map(FieldValue::Uuid),
            FieldType::Json => row
                .try_get::<Option<serde_json::Value>, _>(name)?
                .map(FieldValue::Json),
            FieldType::Binary => row.try_get::<Option<Vec<u8>>, _>(name)?.map(FieldValue::Bytes),
            FieldType::String | FieldType::Enumeration { .. } | FieldType::Reference { .. } => {
                row.try_get::<Option<String>, _>(name)?.map(FieldValue::Text)
            }
        };
        record.insert(field.name.clone(), value.unwrap_or(FieldValue::Null));
    }
    Ok(record)
}

#[async_trait]
impl EntityStore for PgStore {
    async fn fetch(
        &self,
        entity: &TypeDescriptor,
        id: &FieldValue,
    ) -> Result<Option<Record>, StorageError> {
        let q = sql::select_by_id(entity, id);
        let row = Self::prepare(&q).fetch_optional(&self.pool).await?;
        row.map(|r| row_to_record(entity, &r)).transpose()
    }

    async fn select(
        &self,
        entity: &TypeDescriptor,
        filter: &FilterPredicate,
    ) -> Result<Vec<Record>, StorageError> {
        let q = sql::select_list(entity, filter);
        let rows = Self::prepare(&q).fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_record(entity, r)).collect()
    }

    async fn insert(
        &self,
        entity: &TypeDescriptor,
        values: &Assignments,
    ) -> Result<Record, StorageError> {
        let q = sql::insert(entity, values);
        let row = self
            .fetch_optional_tx(&q)
            .await?
            .ok_or(StorageError::Database(sqlx::Error::RowNotFound))?;
        row_to_record(entity, &row)
    }

    async fn update(
        &self,
        entity: &TypeDescriptor,
        id: &FieldValue,
        values: &Assignments,
    ) -> Result<Option<Record>, StorageError> {
        let q = sql::update(entity, id, values);
        let row = self.fetch_optional_tx(&q).await?;
        row.map(|r| row_to_record(entity, &r)).transpose()
    }

    async fn delete(&self, entity: &TypeDescriptor, id: &FieldValue) -> Result<bool, StorageError> {
        let q = sql::delete(entity, id);
        Ok(self.fetch_optional_tx(&q).await?.is_some())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}
