//! Catalog validation: identifiers, uniqueness, primary keys, references.

use crate::config::CatalogConfig;
use crate::descriptor::FieldType;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"))
}

fn check_identifier(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    if identifier().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// `Entity` within `namespace`, or an already qualified `ns.Entity`.
pub fn qualify_target(namespace: &str, target: &str) -> String {
    if target.contains('.') {
        target.to_string()
    } else {
        format!("{}.{}", namespace, target)
    }
}

pub fn validate(config: &CatalogConfig) -> Result<(), ConfigError> {
    let mut entity_names = HashSet::new();
    for ns in &config.namespaces {
        check_identifier("namespace", &ns.name)?;
        for entity in &ns.entities {
            check_identifier("entity", &entity.name)?;
            let qualified = format!("{}.{}", ns.name, entity.name);
            if !entity_names.insert(qualified.clone()) {
                return Err(ConfigError::DuplicateEntity(qualified));
            }
        }
    }

    for ns in &config.namespaces {
        for entity in &ns.entities {
            let qualified = format!("{}.{}", ns.name, entity.name);
            let mut field_names = HashSet::new();
            for field in &entity.fields {
                check_identifier("field", &field.name)?;
                if !field_names.insert(field.name.as_str()) {
                    return Err(ConfigError::DuplicateField {
                        entity: qualified.clone(),
                        field: field.name.clone(),
                    });
                }
                match field.type_.as_str() {
                    "reference" => {
                        let target = field.target.as_deref().ok_or_else(|| ConfigError::MissingReference {
                            kind: "reference target",
                            id: format!("{}.{}", qualified, field.name),
                        })?;
                        let target = qualify_target(&ns.name, target);
                        if !entity_names.contains(&target) {
                            return Err(ConfigError::MissingReference {
                                kind: "entity",
                                id: target,
                            });
                        }
                    }
                    "enumeration" => {
                        if field.choices.is_empty() {
                            return Err(ConfigError::MissingChoices {
                                entity: qualified.clone(),
                                field: field.name.clone(),
                            });
                        }
                    }
                    other => {
                        if FieldType::from_scalar_name(other).is_none() {
                            return Err(ConfigError::UnknownFieldType {
                                entity: qualified.clone(),
                                field: field.name.clone(),
                                type_name: other.to_string(),
                            });
                        }
                    }
                }
            }

            let keys: Vec<_> = entity.fields.iter().filter(|f| f.primary_key).collect();
            let [key] = keys.as_slice() else {
                return Err(ConfigError::InvalidPrimaryKey {
                    entity: qualified,
                    reason: format!("expected exactly one primary key field, found {}", keys.len()),
                });
            };
            if matches!(key.type_.as_str(), "json" | "binary" | "reference") || key.nullable {
                return Err(ConfigError::InvalidPrimaryKey {
                    entity: qualified,
                    reason: format!("{} cannot be a primary key", key.name),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EntityConfig, FieldConfig, NamespaceConfig};

    fn id() -> FieldConfig {
        FieldConfig {
            primary_key: true,
            auto_generated: true,
            ..FieldConfig::new("id", "integer")
        }
    }

    fn catalog(entities: Vec<EntityConfig>) -> CatalogConfig {
        CatalogConfig {
            namespaces: vec![NamespaceConfig {
                name: "app".into(),
                schema: None,
                entities,
            }],
        }
    }

    fn entity(name: &str, fields: Vec<FieldConfig>) -> EntityConfig {
        EntityConfig {
            name: name.into(),
            table: None,
            fields,
        }
    }

    #[test]
    fn accepts_forward_references() {
        let post = entity(
            "Post",
            vec![
                id(),
                FieldConfig {
                    target: Some("User".into()),
                    ..FieldConfig::new("author", "reference")
                },
            ],
        );
        let user = entity("User", vec![id()]);
        validate(&catalog(vec![post, user])).unwrap();
    }

    #[test]
    fn rejects_dangling_reference() {
        let post = entity(
            "Post",
            vec![
                id(),
                FieldConfig {
                    target: Some("shop.Customer".into()),
                    ..FieldConfig::new("author", "reference")
                },
            ],
        );
        let err = validate(&catalog(vec![post])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { id, .. } if id == "shop.Customer"));
    }

    #[test]
    fn rejects_bad_names_and_types() {
        let err = validate(&catalog(vec![entity("My User", vec![id()])])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdentifier { kind: "entity", .. }));

        let err = validate(&catalog(vec![entity("User", vec![id(), FieldConfig::new("x", "varchar")])]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFieldType { type_name, .. } if type_name == "varchar"));

        let err = validate(&catalog(vec![entity("User", vec![id(), FieldConfig::new("id", "string")])]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField { .. }));
    }

    #[test]
    fn rejects_missing_or_unusable_primary_key() {
        let err = validate(&catalog(vec![entity("User", vec![FieldConfig::new("a", "string")])]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrimaryKey { .. }));

        let blob_key = FieldConfig {
            primary_key: true,
            ..FieldConfig::new("blob", "binary")
        };
        let err = validate(&catalog(vec![entity("User", vec![blob_key])])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrimaryKey { .. }));
    }

    #[test]
    fn enumeration_needs_choices() {
        let err = validate(&catalog(vec![entity(
            "User",
            vec![id(), FieldConfig::new("status", "enumeration")],
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingChoices { .. }));
    }
}
