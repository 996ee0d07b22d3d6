//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a type descriptor.

use crate::descriptor::TypeDescriptor;
use crate::query::FilterPredicate;
use crate::serializer::Assignments;
use crate::descriptor::FieldType;
use crate::sql::params::{placeholder, select_cast};
use crate::value::FieldValue;

/// Quote identifier for PostgreSQL (safe: only from the catalog).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(entity: &TypeDescriptor) -> String {
    format!("{}.{}", quoted(entity.storage_namespace()), quoted(entity.table()))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: FieldValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Every field, cast so each column decodes as its field type.
fn select_column_list(entity: &TypeDescriptor) -> String {
    entity
        .fields()
        .iter()
        .map(|f| {
            let q = quoted(&f.name);
            format!("{}::{} AS {}", q, select_cast(&f.field_type), q)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn pk_condition(entity: &TypeDescriptor, q: &mut QueryBuf, id: &FieldValue) -> String {
    let pk = entity.primary_key();
    let n = q.push_param(id.clone());
    format!("{} = {}", quoted(&pk.name), placeholder(pk, n))
}

/// SELECT by primary key.
pub fn select_by_id(entity: &TypeDescriptor, id: &FieldValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let condition = pk_condition(entity, &mut q, id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select_column_list(entity),
        qualified_table(entity),
        condition
    );
    q
}

/// SELECT with an equality conjunction, ORDER BY primary key. Params bound in clause order.
pub fn select_list(entity: &TypeDescriptor, filter: &FilterPredicate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (name, value) in filter.clauses() {
        let Some(field) = entity.field(name) else { continue };
        let n = q.push_param(value.clone());
        // json has no equality operator; compare both sides as jsonb
        let condition = match field.field_type.storage_type() {
            FieldType::Json => format!("{}::jsonb = ${}::jsonb", quoted(name), n),
            _ => format!("{} = {}", quoted(name), placeholder(field, n)),
        };
        where_parts.push(condition);
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        select_column_list(entity),
        qualified_table(entity),
        where_clause,
        quoted(&entity.primary_key().name)
    );
    q
}

/// INSERT of the supplied fields only; the database fills the rest.
pub fn insert(entity: &TypeDescriptor, values: &Assignments) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for field in entity.fields() {
        let Some(value) = values.get(&field.name) else { continue };
        let n = q.push_param(value.clone());
        cols.push(quoted(&field.name));
        placeholders.push(placeholder(field, n));
    }
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(entity),
            returning
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(entity),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only the supplied fields. With nothing to set, selects the row instead.
pub fn update(entity: &TypeDescriptor, id: &FieldValue, values: &Assignments) -> QueryBuf {
    if values.is_empty() {
        return select_by_id(entity, id);
    }
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for field in entity.fields() {
        let Some(value) = values.get(&field.name) else { continue };
        let n = q.push_param(value.clone());
        sets.push(format!("{} = {}", quoted(&field.name), placeholder(field, n)));
    }
    let condition = pk_condition(entity, &mut q, id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING {}",
        qualified_table(entity),
        sets.join(", "),
        condition,
        select_column_list(entity)
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &TypeDescriptor, id: &FieldValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let condition = pk_condition(entity, &mut q, id);
    let pk = quoted(&entity.primary_key().name);
    q.sql = format!(
        "DELETE FROM {} WHERE {} RETURNING {}",
        qualified_table(entity),
        condition,
        pk
    );
    q
}
