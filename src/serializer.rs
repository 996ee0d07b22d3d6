//! Bridges wire JSON and typed records, validating writes against the descriptor.

use crate::descriptor::TypeDescriptor;
use crate::error::AppError;
use crate::store::Record;
use crate::value::FieldValue;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Required fields must be present.
    Create,
    /// Only supplied fields are validated and applied.
    Update,
}

/// Validated field assignments, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignments {
    values: Vec<(String, FieldValue)>,
}

impl Assignments {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One key per field in declared order.
pub fn to_wire(record: &Record, descriptor: &TypeDescriptor) -> Result<Value, AppError> {
    let mut out = Map::new();
    for field in descriptor.fields() {
        let value = record.get(&field.name).ok_or_else(|| AppError::InconsistentRecord {
            entity: descriptor.qualified_name().to_string(),
            reason: format!("missing field {}", field.name),
        })?;
        let encoded = field
            .field_type
            .to_json(value)
            .ok_or_else(|| AppError::InconsistentRecord {
                entity: descriptor.qualified_name().to_string(),
                reason: format!("field {} holds {:?}, expected {}", field.name, value, field.type_tag()),
            })?;
        out.insert(field.name.clone(), encoded);
    }
    Ok(Value::Object(out))
}

pub fn from_wire(
    body: &Value,
    descriptor: &TypeDescriptor,
    mode: WriteMode,
) -> Result<Assignments, AppError> {
    let object = body
        .as_object()
        .ok_or_else(|| AppError::BadRequest("body must be a JSON object".into()))?;

    for key in object.keys() {
        let field = descriptor
            .field(key)
            .ok_or_else(|| AppError::UnknownField(key.clone()))?;
        if field.auto_generated {
            return Err(AppError::ReadOnlyField(key.clone()));
        }
    }

    if mode == WriteMode::Create {
        if let Some(missing) = descriptor
            .fields()
            .iter()
            .find(|f| f.is_required() && !object.contains_key(&f.name))
        {
            return Err(AppError::MissingRequiredField(missing.name.clone()));
        }
    }

    let mut values = Vec::with_capacity(object.len());
    for field in descriptor.fields() {
        let Some(raw) = object.get(&field.name) else { continue };
        let value = if raw.is_null() && field.nullable {
            FieldValue::Null
        } else {
            field
                .field_type
                .from_json(raw)
                .ok_or_else(|| AppError::FieldTypeMismatch {
                    field: field.name.clone(),
                    value: raw.clone(),
                    expected: field.type_tag(),
                })?
        };
        values.push((field.name.clone(), value));
    }
    Ok(Assignments { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FieldType};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user() -> TypeDescriptor {
        TypeDescriptor::new(
            "app",
            "User",
            "app",
            "user",
            vec![
                FieldDescriptor {
                    primary_key: true,
                    auto_generated: true,
                    has_default: true,
                    ..FieldDescriptor::new("id", FieldType::Integer)
                },
                FieldDescriptor::new("email", FieldType::String),
                FieldDescriptor {
                    nullable: true,
                    ..FieldDescriptor::new("first_name", FieldType::String)
                },
                FieldDescriptor {
                    has_default: true,
                    default: Some(FieldValue::Bool(true)),
                    ..FieldDescriptor::new("active", FieldType::Boolean)
                },
                FieldDescriptor {
                    nullable: true,
                    ..FieldDescriptor::new("joined", FieldType::Timestamp)
                },
            ],
        )
        .unwrap()
    }

    fn record() -> Record {
        Record::from([
            ("id".to_string(), FieldValue::Int(1)),
            ("email".to_string(), FieldValue::Text("a@b.com".into())),
            ("first_name".to_string(), FieldValue::Null),
            ("active".to_string(), FieldValue::Bool(true)),
            (
                "joined".to_string(),
                FieldValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()),
            ),
        ])
    }

    #[test]
    fn to_wire_emits_every_field_in_order() {
        let wire = to_wire(&record(), &user()).unwrap();
        let keys: Vec<&String> = wire.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["id", "email", "first_name", "active", "joined"]);
        assert_eq!(
            wire,
            json!({"id": 1, "email": "a@b.com", "first_name": null, "active": true, "joined": "2024-05-06T07:08:09Z"})
        );
    }

    #[test]
    fn to_wire_flags_inconsistent_records() {
        let mut rec = record();
        rec.remove("email");
        assert!(matches!(to_wire(&rec, &user()), Err(AppError::InconsistentRecord { .. })));

        let mut rec = record();
        rec.insert("id".into(), FieldValue::Text("one".into()));
        assert!(matches!(to_wire(&rec, &user()), Err(AppError::InconsistentRecord { .. })));
    }

    #[test]
    fn auto_generated_fields_are_read_only_in_both_modes() {
        for mode in [WriteMode::Create, WriteMode::Update] {
            for id in [json!(1), json!(null), json!("x")] {
                let err = from_wire(&json!({"email": "a@b.com", "id": id}), &user(), mode).unwrap_err();
                assert!(matches!(err, AppError::ReadOnlyField(ref k) if k == "id"), "{mode:?}");
            }
        }
    }

    #[test]
    fn create_requires_non_nullable_fields_without_default() {
        let err = from_wire(&json!({"first_name": "x"}), &user(), WriteMode::Create).unwrap_err();
        assert!(matches!(err, AppError::MissingRequiredField(f) if f == "email"));
        let ok = from_wire(&json!({"email": "a@b.com"}), &user(), WriteMode::Create).unwrap();
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let a = from_wire(&json!({"first_name": "randi"}), &user(), WriteMode::Update).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a.get("first_name"), Some(&FieldValue::Text("randi".into())));
        assert_eq!(a.get("email"), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_wire(&json!({"email": "a", "nickname": "z"}), &user(), WriteMode::Update).unwrap_err();
        assert!(matches!(err, AppError::UnknownField(k) if k == "nickname"));
    }

    #[test]
    fn null_only_for_nullable_fields() {
        let a = from_wire(&json!({"first_name": null}), &user(), WriteMode::Update).unwrap();
        assert_eq!(a.get("first_name"), Some(&FieldValue::Null));

        let err = from_wire(&json!({"email": null}), &user(), WriteMode::Update).unwrap_err();
        assert!(matches!(
            err,
            AppError::FieldTypeMismatch { field, value: Value::Null, expected: "string" } if field == "email"
        ));
    }

    #[test]
    fn type_mismatch_reports_value() {
        let err = from_wire(&json!({"active": "maybe"}), &user(), WriteMode::Update).unwrap_err();
        assert!(matches!(
            err,
            AppError::FieldTypeMismatch { field, expected: "boolean", .. } if field == "active"
        ));
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(matches!(
            from_wire(&json!([1]), &user(), WriteMode::Create),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn identity_update_round_trips() {
        let descriptor = user();
        let wire = to_wire(&record(), &descriptor).unwrap();
        let mut writable = wire.clone();
        writable.as_object_mut().unwrap().retain(|k, _| {
            !descriptor.field(k).map(|f| f.auto_generated).unwrap_or(false)
        });
        let assignments = from_wire(&writable, &descriptor, WriteMode::Update).unwrap();

        let mut reapplied = record();
        for (field, value) in assignments.iter() {
            reapplied.insert(field.to_string(), value.clone());
        }
        assert_eq!(to_wire(&reapplied, &descriptor).unwrap(), wire);
    }
}
