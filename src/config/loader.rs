//! Load the catalog from a JSON file and resolve it into the entity registry.

use crate::case::to_snake_case;
use crate::config::{qualify_target, validate, CatalogConfig, FieldConfig};
use crate::descriptor::{FieldDescriptor, FieldType, TypeDescriptor};
use crate::error::ConfigError;
use crate::registry::EntityRegistry;
use crate::value::FieldValue;
use std::collections::HashMap;
use std::path::Path;

/// Build the registry from a catalog (validates first).
pub fn resolve(config: &CatalogConfig) -> Result<EntityRegistry, ConfigError> {
    validate(config)?;

    let mut key_types: HashMap<String, FieldType> = HashMap::new();
    for ns in &config.namespaces {
        for entity in &ns.entities {
            if let Some(pk) = entity.fields.iter().find(|f| f.primary_key) {
                key_types.insert(format!("{}.{}", ns.name, entity.name), scalar_type(pk)?);
            }
        }
    }

    let mut descriptors = Vec::new();
    for ns in &config.namespaces {
        let schema = ns.schema.as_deref().unwrap_or(&ns.name);
        for entity in &ns.entities {
            let qualified = format!("{}.{}", ns.name, entity.name);
            let mut fields = Vec::with_capacity(entity.fields.len());
            for f in &entity.fields {
                let field_type = match f.type_.as_str() {
                    "reference" => {
                        let target = qualify_target(&ns.name, f.target.as_deref().unwrap_or_default());
                        let key = key_types.get(&target).cloned().ok_or_else(|| {
                            ConfigError::MissingReference {
                                kind: "entity",
                                id: target.clone(),
                            }
                        })?;
                        FieldType::Reference {
                            target,
                            key: Box::new(key),
                        }
                    }
                    _ => scalar_type(f)?,
                };
                let default = match &f.default {
                    Some(raw) if raw.is_null() && f.nullable => Some(FieldValue::Null),
                    Some(raw) => Some(field_type.from_json(raw).ok_or_else(|| {
                        ConfigError::InvalidDefault {
                            entity: qualified.clone(),
                            field: f.name.clone(),
                        }
                    })?),
                    None => None,
                };
                fields.push(FieldDescriptor {
                    name: f.name.clone(),
                    field_type,
                    nullable: f.nullable,
                    auto_generated: f.auto_generated,
                    has_default: f.has_default || default.is_some(),
                    primary_key: f.primary_key,
                    default,
                    column_type: f.column_type.clone(),
                });
            }
            let table = entity
                .table
                .clone()
                .unwrap_or_else(|| to_snake_case(&entity.name));
            descriptors.push(TypeDescriptor::new(&ns.name, &entity.name, schema, table, fields)?);
        }
    }

    let registry = EntityRegistry::new(descriptors)?;
    tracing::info!(entities = registry.len(), "catalog resolved");
    Ok(registry)
}

/// Field type for every kind but references.
fn scalar_type(field: &FieldConfig) -> Result<FieldType, ConfigError> {
    match field.type_.as_str() {
        "enumeration" => Ok(FieldType::Enumeration {
            choices: field.choices.clone(),
        }),
        other => FieldType::from_scalar_name(other).ok_or_else(|| ConfigError::UnknownFieldType {
            entity: String::new(),
            field: field.name.clone(),
            type_name: other.to_string(),
        }),
    }
}

pub fn parse_catalog(json: &str) -> Result<CatalogConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read a JSON catalog file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<CatalogConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_catalog(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "namespaces": [
            {
                "name": "blog",
                "schema": "public",
                "entities": [
                    {
                        "name": "BlogPost",
                        "fields": [
                            {"name": "id", "type": "uuid", "primary_key": true, "auto_generated": true},
                            {"name": "author", "type": "reference", "target": "app.User"},
                            {"name": "status", "type": "enumeration", "choices": ["draft", "live"], "default": "draft"},
                            {"name": "body", "type": "string", "nullable": true}
                        ]
                    }
                ]
            },
            {
                "name": "app",
                "entities": [
                    {
                        "name": "User",
                        "table": "users",
                        "fields": [
                            {"name": "id", "type": "integer", "primary_key": true, "auto_generated": true, "has_default": true},
                            {"name": "email", "type": "string"}
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn resolves_storage_bindings_and_references() {
        let registry = resolve(&parse_catalog(CATALOG).unwrap()).unwrap();
        assert_eq!(registry.len(), 2);

        let post = registry.resolve("blog.BlogPost").unwrap();
        assert_eq!(post.storage_namespace(), "public");
        assert_eq!(post.table(), "blog_post");
        assert_eq!(post.primary_key().name, "id");
        assert_eq!(
            post.field("author").unwrap().field_type,
            FieldType::Reference {
                target: "app.User".into(),
                key: Box::new(FieldType::Integer),
            }
        );

        let status = post.field("status").unwrap();
        assert!(status.has_default);
        assert_eq!(status.default, Some(FieldValue::Text("draft".into())));

        let user = registry.resolve("app.User").unwrap();
        assert_eq!(user.storage_namespace(), "app");
        assert_eq!(user.table(), "users");
    }

    #[test]
    fn default_must_match_type() {
        let raw = r#"{"namespaces": [{"name": "app", "entities": [{"name": "User", "fields": [
            {"name": "id", "type": "integer", "primary_key": true},
            {"name": "age", "type": "integer", "default": "old"}
        ]}]}]}"#;
        let err = resolve(&parse_catalog(raw).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDefault { field, .. } if field == "age"));
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        assert!(matches!(parse_catalog("{"), Err(ConfigError::Load(_))));
    }
}
