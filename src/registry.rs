//! Entity registry: qualified name -> type descriptor. Built once at startup, read-only afterwards.

use crate::descriptor::TypeDescriptor;
use crate::error::{AppError, ConfigError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Split `namespace.Entity`. Exactly one separator and two non-empty parts.
pub fn split_qualified_name(name: &str) -> Option<(&str, &str)> {
    let (namespace, entity) = name.split_once('.')?;
    if namespace.is_empty() || entity.is_empty() || entity.contains('.') {
        return None;
    }
    Some((namespace, entity))
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    by_name: BTreeMap<String, Arc<TypeDescriptor>>,
}

impl EntityRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Result<Self, ConfigError> {
        let mut by_name = BTreeMap::new();
        for descriptor in descriptors {
            let name = descriptor.qualified_name().to_string();
            if by_name.insert(name.clone(), Arc::new(descriptor)).is_some() {
                return Err(ConfigError::DuplicateEntity(name));
            }
        }
        Ok(EntityRegistry { by_name })
    }

    /// Qualified names registered under `namespace`, alphabetically.
    pub fn list_entities(&self, namespace: &str) -> Result<Vec<&str>, AppError> {
        let names: Vec<&str> = self
            .by_name
            .values()
            .filter(|d| d.namespace() == namespace)
            .map(|d| d.qualified_name())
            .collect();
        if names.is_empty() {
            return Err(AppError::NamespaceNotFound(namespace.to_string()));
        }
        Ok(names)
    }

    pub fn resolve(&self, qualified_name: &str) -> Result<Arc<TypeDescriptor>, AppError> {
        split_qualified_name(qualified_name)
            .and_then(|_| self.by_name.get(qualified_name))
            .cloned()
            .ok_or_else(|| AppError::EntityNotFound(qualified_name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FieldType};

    fn entity(namespace: &str, name: &str) -> TypeDescriptor {
        let id = FieldDescriptor {
            primary_key: true,
            ..FieldDescriptor::new("id", FieldType::Integer)
        };
        TypeDescriptor::new(namespace, name, namespace, name.to_lowercase(), vec![id]).unwrap()
    }

    fn registry() -> EntityRegistry {
        EntityRegistry::new(vec![
            entity("app", "User"),
            entity("shop", "Order"),
            entity("app", "Group"),
            entity("app2", "Thing"),
        ])
        .unwrap()
    }

    #[test]
    fn lists_namespace_alphabetically() {
        assert_eq!(registry().list_entities("app").unwrap(), vec!["app.Group", "app.User"]);
    }

    #[test]
    fn unknown_namespace_fails() {
        assert!(matches!(
            registry().list_entities("nope"),
            Err(AppError::NamespaceNotFound(ns)) if ns == "nope"
        ));
    }

    #[test]
    fn resolve_is_case_sensitive_and_strict() {
        let reg = registry();
        assert_eq!(reg.resolve("app.User").unwrap().name(), "User");
        for bad in ["app.user", "User", "app.", ".User", "app.User.x", ""] {
            assert!(
                matches!(reg.resolve(bad), Err(AppError::EntityNotFound(_))),
                "{bad} should not resolve"
            );
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = EntityRegistry::new(vec![entity("app", "User"), entity("app", "User")]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntity(n) if n == "app.User"));
    }
}
