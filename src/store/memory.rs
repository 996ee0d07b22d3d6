//! In-process store. Each call holds the write lock for its whole duration, so calls are atomic.

use super::{EntityStore, Record, StorageError};
use crate::descriptor::{FieldDescriptor, FieldType, TypeDescriptor};
use crate::query::FilterPredicate;
use crate::serializer::Assignments;
use crate::value::FieldValue;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum RowKey {
    Int(i64),
    Text(String),
}

fn row_key(value: &FieldValue) -> Option<RowKey> {
    Some(match value {
        FieldValue::Null => return None,
        FieldValue::Int(n) => RowKey::Int(*n),
        FieldValue::Text(s) | FieldValue::Decimal(s) => RowKey::Text(s.clone()),
        FieldValue::Uuid(u) => RowKey::Text(u.to_string()),
        FieldValue::Date(d) => RowKey::Text(d.to_string()),
        FieldValue::Timestamp(ts) => RowKey::Text(ts.to_rfc3339()),
        FieldValue::Bool(b) => RowKey::Text(b.to_string()),
        FieldValue::Float(f) => RowKey::Text(f.to_string()),
        FieldValue::Json(_) | FieldValue::Bytes(_) => return None,
    })
}

#[derive(Default)]
struct Table {
    rows: BTreeMap<RowKey, Record>,
    next_id: i64,
}

impl Table {
    fn generate(&mut self, field: &FieldDescriptor) -> FieldValue {
        match field.field_type.storage_type() {
            FieldType::Integer => {
                self.next_id += 1;
                FieldValue::Int(self.next_id)
            }
            FieldType::Uuid => FieldValue::Uuid(uuid::Uuid::new_v4()),
            FieldType::Timestamp => FieldValue::Timestamp(Utc::now()),
            FieldType::Date => FieldValue::Date(Utc::now().date_naive()),
            _ => FieldValue::Null,
        }
    }

    /// Keeps generated integer keys ahead of client-supplied ones.
    fn observe_key(&mut self, key: &RowKey) {
        if let RowKey::Int(n) = key {
            self.next_id = self.next_id.max(*n);
        }
    }
}

fn primary_key_of(entity: &TypeDescriptor, record: &Record) -> Result<RowKey, StorageError> {
    let pk = &entity.primary_key().name;
    record
        .get(pk)
        .and_then(row_key)
        .ok_or_else(|| StorageError::Conflict(format!("{}.{} must be set", entity.qualified_name(), pk)))
}

/// Entity rows keyed by qualified name, then primary key.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, Table>) -> T) -> Result<T, StorageError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        entity: &TypeDescriptor,
        f: impl FnOnce(&mut Table) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))?;
        f(guard.entry(entity.qualified_name().to_string()).or_default())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch(
        &self,
        entity: &TypeDescriptor,
        id: &FieldValue,
    ) -> Result<Option<Record>, StorageError> {
        let Some(key) = row_key(id) else { return Ok(None) };
        self.read(|tables| {
            tables
                .get(entity.qualified_name())
                .and_then(|t| t.rows.get(&key))
                .cloned()
        })
    }

    async fn select(
        &self,
        entity: &TypeDescriptor,
        filter: &FilterPredicate,
    ) -> Result<Vec<Record>, StorageError> {
        self.read(|tables| {
            tables
                .get(entity.qualified_name())
                .map(|t| t.rows.values().filter(|r| filter.matches(r)).cloned().collect())
                .unwrap_or_default()
        })
    }

    async fn insert(
        &self,
        entity: &TypeDescriptor,
        values: &Assignments,
    ) -> Result<Record, StorageError> {
        self.write(entity, |table| {
            let mut record = Record::with_capacity(entity.fields().len());
            for field in entity.fields() {
                let value = match values.get(&field.name) {
                    Some(v) => v.clone(),
                    None if field.auto_generated => table.generate(field),
                    None => field.default.clone().unwrap_or(FieldValue::Null),
                };
                record.insert(field.name.clone(), value);
            }
            let key = primary_key_of(entity, &record)?;
            if table.rows.contains_key(&key) {
                return Err(StorageError::Conflict(format!(
                    "duplicate primary key for {}",
                    entity.qualified_name()
                )));
            }
            table.observe_key(&key);
            table.rows.insert(key, record.clone());
            Ok(record)
        })
    }

    async fn update(
        &self,
        entity: &TypeDescriptor,
        id: &FieldValue,
        values: &Assignments,
    ) -> Result<Option<Record>, StorageError> {
        let Some(key) = row_key(id) else { return Ok(None) };
        self.write(entity, |table| {
            let Some(current) = table.rows.get(&key) else { return Ok(None) };
            let mut record = current.clone();
            for (field, value) in values.iter() {
                record.insert(field.to_string(), value.clone());
            }
            let new_key = primary_key_of(entity, &record)?;
            if new_key != key {
                if table.rows.contains_key(&new_key) {
                    return Err(StorageError::Conflict(format!(
                        "duplicate primary key for {}",
                        entity.qualified_name()
                    )));
                }
                table.rows.remove(&key);
                table.observe_key(&new_key);
            }
            table.rows.insert(new_key, record.clone());
            Ok(Some(record))
        })
    }

    async fn delete(&self, entity: &TypeDescriptor, id: &FieldValue) -> Result<bool, StorageError> {
        let Some(key) = row_key(id) else { return Ok(false) };
        self.write(entity, |table| Ok(table.rows.remove(&key).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::translate;
    use crate::serializer::{from_wire, WriteMode};
    use serde_json::json;

    fn tag() -> TypeDescriptor {
        TypeDescriptor::new(
            "app",
            "Tag",
            "app",
            "tag",
            vec![
                FieldDescriptor {
                    primary_key: true,
                    auto_generated: true,
                    ..FieldDescriptor::new("id", FieldType::Integer)
                },
                FieldDescriptor::new("label", FieldType::String),
                FieldDescriptor {
                    has_default: true,
                    default: Some(FieldValue::Int(0)),
                    ..FieldDescriptor::new("uses", FieldType::Integer)
                },
                FieldDescriptor {
                    auto_generated: true,
                    ..FieldDescriptor::new("created", FieldType::Timestamp)
                },
            ],
        )
        .unwrap()
    }

    fn create(label: &str) -> Assignments {
        from_wire(&json!({ "label": label }), &tag(), WriteMode::Create).unwrap()
    }

    #[tokio::test]
    async fn insert_fills_generated_and_default_fields() {
        let store = MemoryStore::new();
        let first = store.insert(&tag(), &create("a")).await.unwrap();
        let second = store.insert(&tag(), &create("b")).await.unwrap();
        assert_eq!(first["id"], FieldValue::Int(1));
        assert_eq!(second["id"], FieldValue::Int(2));
        assert_eq!(first["uses"], FieldValue::Int(0));
        assert!(matches!(first["created"], FieldValue::Timestamp(_)));
    }

    #[tokio::test]
    async fn select_filters_by_predicate() {
        let store = MemoryStore::new();
        store.insert(&tag(), &create("a")).await.unwrap();
        store.insert(&tag(), &create("b")).await.unwrap();
        let filter = translate(&tag(), &[("label".into(), "b".into())]).unwrap();
        let rows = store.select(&tag(), &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], FieldValue::Int(2));
        assert!(store
            .select(&tag(), &translate(&tag(), &[("label".into(), "zzz".into())]).unwrap())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_missing_rows() {
        let store = MemoryStore::new();
        let values = from_wire(&json!({ "label": "x" }), &tag(), WriteMode::Update).unwrap();
        assert!(store.update(&tag(), &FieldValue::Int(9), &values).await.unwrap().is_none());
        assert!(!store.delete(&tag(), &FieldValue::Int(9)).await.unwrap());
    }

    #[tokio::test]
    async fn rekeying_onto_an_existing_row_conflicts() {
        let code = TypeDescriptor::new(
            "app",
            "Code",
            "app",
            "code",
            vec![FieldDescriptor {
                primary_key: true,
                ..FieldDescriptor::new("code", FieldType::String)
            }],
        )
        .unwrap();
        let store = MemoryStore::new();
        for c in ["a", "b"] {
            let v = from_wire(&json!({ "code": c }), &code, WriteMode::Create).unwrap();
            store.insert(&code, &v).await.unwrap();
        }
        let dup = from_wire(&json!({ "code": "a" }), &code, WriteMode::Create).unwrap();
        assert!(matches!(store.insert(&code, &dup).await, Err(StorageError::Conflict(_))));

        let rename = from_wire(&json!({ "code": "b" }), &code, WriteMode::Update).unwrap();
        let err = store.update(&code, &FieldValue::Text("a".into()), &rename).await;
        assert!(matches!(err, Err(StorageError::Conflict(_))));

        let rename = from_wire(&json!({ "code": "c" }), &code, WriteMode::Update).unwrap();
        store.update(&code, &FieldValue::Text("a".into()), &rename).await.unwrap();
        assert!(store.fetch(&code, &FieldValue::Text("a".into())).await.unwrap().is_none());
        assert!(store.fetch(&code, &FieldValue::Text("c".into())).await.unwrap().is_some());
    }
}
