//! Query translation: untyped `?field=value` pairs -> typed equality predicate.

use crate::descriptor::TypeDescriptor;
use crate::error::AppError;
use crate::store::Record;
use crate::value::FieldValue;

/// Conjunction of `field = value` constraints, in first-occurrence order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterPredicate {
    clauses: Vec<(String, FieldValue)>,
}

impl FilterPredicate {
    pub fn clauses(&self) -> &[(String, FieldValue)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }

    /// Repeated fields keep their first position; the last value wins.
    fn push(&mut self, field: &str, value: FieldValue) {
        match self.clauses.iter_mut().find(|(f, _)| f == field) {
            Some(clause) => clause.1 = value,
            None => self.clauses.push((field.to_string(), value)),
        }
    }
}

pub fn translate(
    descriptor: &TypeDescriptor,
    raw_params: &[(String, String)],
) -> Result<FilterPredicate, AppError> {
    let mut predicate = FilterPredicate::default();
    for (key, raw) in raw_params {
        let field = descriptor
            .field(key)
            .filter(|f| f.is_filterable())
            .ok_or_else(|| AppError::UnknownFilterField(key.clone()))?;
        let value = field
            .field_type
            .parse_str(raw)
            .ok_or_else(|| AppError::FilterValueTypeMismatch {
                field: key.clone(),
                value: raw.clone(),
                expected: field.type_tag(),
            })?;
        predicate.push(key, value);
    }
    Ok(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FieldType};

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
                    ..FieldDescriptor::new("id", FieldType::Integer)
                },
                FieldDescriptor::new("email", FieldType::String),
                FieldDescriptor::new("active", FieldType::Boolean),
                FieldDescriptor {
                    nullable: true,
                    ..FieldDescriptor::new("avatar", FieldType::Binary)
                },
            ],
        )
        .unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn builds_typed_conjunction() {
        let p = translate(&user(), &params(&[("email", "a@b.com"), ("active", "true")])).unwrap();
        assert_eq!(
            p.clauses(),
            &[
                ("email".to_string(), FieldValue::Text("a@b.com".into())),
                ("active".to_string(), FieldValue::Bool(true)),
            ]
        );
    }

    #[test]
    fn empty_params_give_empty_predicate() {
        assert!(translate(&user(), &[]).unwrap().is_empty());
    }

    #[test]
    fn unknown_field_is_never_ignored() {
        let err = translate(&user(), &params(&[("bogus", "1")])).unwrap_err();
        assert!(matches!(err, AppError::UnknownFilterField(k) if k == "bogus"));
    }

    #[test]
    fn binary_fields_are_not_filterable() {
        let err = translate(&user(), &params(&[("avatar", "aGk=")])).unwrap_err();
        assert!(matches!(err, AppError::UnknownFilterField(k) if k == "avatar"));
    }

    #[test]
    fn mismatch_reports_expected_type() {
        let err = translate(&user(), &params(&[("id", "abc")])).unwrap_err();
        assert!(matches!(
            err,
            AppError::FilterValueTypeMismatch { field, value, expected: "integer" }
                if field == "id" && value == "abc"
        ));
    }

    #[test]
    fn repeated_key_last_value_wins() {
        let p = translate(
            &user(),
            &params(&[("id", "1"), ("email", "x"), ("id", "2")]),
        )
        .unwrap();
        assert_eq!(
            p.clauses(),
            &[
                ("id".to_string(), FieldValue::Int(2)),
                ("email".to_string(), FieldValue::Text("x".into())),
            ]
        );
    }

    #[test]
    fn matches_records() {
        let p = translate(&user(), &params(&[("id", "2")])).unwrap();
        let mut record = Record::new();
        record.insert("id".into(), FieldValue::Int(2));
        assert!(p.matches(&record));
        record.insert("id".into(), FieldValue::Int(3));
        assert!(!p.matches(&record));
    }
}
