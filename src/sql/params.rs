//! Bind typed field values to sqlx queries, and the casts that go with them.

use crate::descriptor::{FieldDescriptor, FieldType};
use crate::value::FieldValue;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// Cast applied to a bound parameter.
pub fn base_cast(ty: &FieldType) -> &'static str {
    match ty.storage_type() {
        FieldType::Integer => "int8",
        FieldType::Float => "float8",
        FieldType::Decimal => "numeric",
        FieldType::Boolean => "bool",
        FieldType::Timestamp => "timestamptz",
        FieldType::Date => "date",
        FieldType::Uuid => "uuid",
        FieldType::Json => "jsonb",
        FieldType::Binary => "bytea",
        FieldType::String | FieldType::Enumeration { .. } | FieldType::Reference { .. } => "text",
    }
}

/// Cast applied to a selected column so it decodes as the Rust type the adapter reads.
/// Numeric has no `String` decoding in sqlx, so decimals come back as text.
pub fn select_cast(ty: &FieldType) -> &'static str {
    match ty.storage_type() {
        FieldType::Decimal => "text",
        other => base_cast(other),
    }
}

/// `$n` with the base cast, then the column's own type when the catalog names one.
pub fn placeholder(field: &FieldDescriptor, n: usize) -> String {
    let base = base_cast(&field.field_type);
    match field.column_type.as_deref() {
        Some(column_type) => format!("${}::{}::{}", n, base, column_type),
        None => format!("${}::{}", n, base),
    }
}

pub fn bind_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &FieldValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Bool(b) => query.bind(*b),
        FieldValue::Int(n) => query.bind(*n),
        FieldValue::Float(f) => query.bind(*f),
        FieldValue::Decimal(s) | FieldValue::Text(s) => query.bind(s.clone()),
        FieldValue::Timestamp(ts) => query.bind(*ts),
        FieldValue::Date(d) => query.bind(*d),
        FieldValue::Uuid(u) => query.bind(*u),
        FieldValue::Json(v) => query.bind(v.clone()),
        FieldValue::Bytes(b) => query.bind(b.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_cast_to_column_type() {
        let mut status = FieldDescriptor::new(
            "status",
            FieldType::Enumeration {
                choices: vec!["a".into()],
            },
        );
        assert_eq!(placeholder(&status, 2), "$2::text");
        status.column_type = Some("\"shop\".\"status\"".into());
        assert_eq!(placeholder(&status, 2), "$2::text::\"shop\".\"status\"");

        let owner = FieldDescriptor::new(
            "owner",
            FieldType::Reference {
                target: "app.User".into(),
                key: Box::new(FieldType::Uuid),
            },
        );
        assert_eq!(placeholder(&owner, 1), "$1::uuid");
    }

    #[test]
    fn decimals_bind_as_numeric_but_select_as_text() {
        assert_eq!(base_cast(&FieldType::Decimal), "numeric");
        assert_eq!(select_cast(&FieldType::Decimal), "text");
        assert_eq!(select_cast(&FieldType::Timestamp), "timestamptz");
        assert_eq!(select_cast(&FieldType::Json), "jsonb");
    }
}
