//! Generic CRUD execution: one code path for every registered entity type.

use crate::descriptor::TypeDescriptor;
use crate::error::AppError;
use crate::query::translate;
use crate::registry::EntityRegistry;
use crate::schema::{describe, summarize, EntitySummary, FieldSchema};
use crate::serializer::{from_wire, to_wire, WriteMode};
use crate::store::EntityStore;
use crate::value::FieldValue;
use serde_json::Value;
use std::sync::Arc;

pub struct CrudService {
    registry: Arc<EntityRegistry>,
    store: Arc<dyn EntityStore>,
}

impl CrudService {
    pub fn new(registry: Arc<EntityRegistry>, store: Arc<dyn EntityStore>) -> Self {
        CrudService { registry, store }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn list_entities(&self, namespace: &str) -> Result<Vec<EntitySummary>, AppError> {
        Ok(summarize(self.registry.list_entities(namespace)?))
    }

    pub fn describe(&self, qualified_name: &str) -> Result<Vec<FieldSchema>, AppError> {
        Ok(describe(&*self.registry.resolve(qualified_name)?))
    }

    /// Rows matching every `field=value` pair; all rows when `params` is empty.
    pub async fn list(
        &self,
        qualified_name: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Value>, AppError> {
        let entity = self.registry.resolve(qualified_name)?;
        let filter = translate(&entity, params)?;
        tracing::debug!(entity = %qualified_name, clauses = filter.clauses().len(), "list");
        let records = self.store.select(&entity, &filter).await?;
        records.iter().map(|r| to_wire(r, &entity)).collect()
    }

    pub async fn read(&self, qualified_name: &str, id: &str) -> Result<Value, AppError> {
        let entity = self.registry.resolve(qualified_name)?;
        let key = parse_id(&entity, id)?;
        tracing::debug!(entity = %qualified_name, id, "read");
        let record = self
            .store
            .fetch(&entity, &key)
            .await?
            .ok_or_else(|| not_found(&entity, id))?;
        to_wire(&record, &entity)
    }

    /// Returns the persisted instance, so store-assigned fields are reflected back.
    pub async fn create(&self, qualified_name: &str, body: &Value) -> Result<Value, AppError> {
        let entity = self.registry.resolve(qualified_name)?;
        let values = from_wire(body, &entity, WriteMode::Create)?;
        tracing::debug!(entity = %qualified_name, fields = values.len(), "create");
        let record = self.store.insert(&entity, &values).await?;
        to_wire(&record, &entity)
    }

    /// Partial update: fields absent from `body` are left untouched.
    pub async fn update(
        &self,
        qualified_name: &str,
        id: &str,
        body: &Value,
    ) -> Result<Value, AppError> {
        let entity = self.registry.resolve(qualified_name)?;
        let key = parse_id(&entity, id)?;
        let current = self
            .store
            .fetch(&entity, &key)
            .await?
            .ok_or_else(|| not_found(&entity, id))?;
        let values = from_wire(body, &entity, WriteMode::Update)?;
        if values.is_empty() {
            return to_wire(&current, &entity);
        }
        tracing::debug!(entity = %qualified_name, id, fields = values.len(), "update");
        let record = self
            .store
            .update(&entity, &key, &values)
            .await?
            .ok_or_else(|| not_found(&entity, id))?;
        to_wire(&record, &entity)
    }

    pub async fn delete(&self, qualified_name: &str, id: &str) -> Result<(), AppError> {
        let entity = self.registry.resolve(qualified_name)?;
        let key = parse_id(&entity, id)?;
        tracing::debug!(entity = %qualified_name, id, "delete");
        if !self.store.delete(&entity, &key).await? {
            return Err(not_found(&entity, id));
        }
        Ok(())
    }
}

fn parse_id(entity: &TypeDescriptor, id: &str) -> Result<FieldValue, AppError> {
    let pk = entity.primary_key();
    pk.field_type.parse_str(id).ok_or_else(|| AppError::InvalidId {
        entity: entity.qualified_name().to_string(),
        id: id.to_string(),
        expected: pk.type_tag(),
    })
}

fn not_found(entity: &TypeDescriptor, id: &str) -> AppError {
    AppError::NotFound {
        entity: entity.qualified_name().to_string(),
        id: id.to_string(),
    }
}
