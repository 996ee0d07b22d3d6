//! Storage collaborator: the trait the CRUD service drives, plus PostgreSQL and in-memory adapters.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::descriptor::TypeDescriptor;
use crate::query::FilterPredicate;
use crate::serializer::Assignments;
use crate::value::FieldValue;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// One entity instance: field name -> typed value.
pub type Record = HashMap<String, FieldValue>;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Constraint violation (duplicate key, dangling reference, check).
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("database: {0}")]
    Database(sqlx::Error),
}

/// Every method is one atomic unit of work.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn fetch(
        &self,
        entity: &TypeDescriptor,
        id: &FieldValue,
    ) -> Result<Option<Record>, StorageError>;

    async fn select(
        &self,
        entity: &TypeDescriptor,
        filter: &FilterPredicate,
    ) -> Result<Vec<Record>, StorageError>;

    /// Returns the persisted record with store-assigned fields filled in.
    async fn insert(
        &self,
        entity: &TypeDescriptor,
        values: &Assignments,
    ) -> Result<Record, StorageError>;

    /// Applies only the given fields. `None` when no row has `id`.
    async fn update(
        &self,
        entity: &TypeDescriptor,
        id: &FieldValue,
        values: &Assignments,
    ) -> Result<Option<Record>, StorageError>;

    /// `false` when no row has `id`.
    async fn delete(&self, entity: &TypeDescriptor, id: &FieldValue) -> Result<bool, StorageError>;

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
