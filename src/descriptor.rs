//! Type and field descriptors: immutable metadata built once per entity type at registration.

use crate::error::ConfigError;
use crate::value::FieldValue;

/// Declared kind of a field. The wire type tag is derived from the variant.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Integer,
    Float,
    /// Arbitrary-precision number carried as its decimal text.
    Decimal,
    String,
    Boolean,
    Timestamp,
    Date,
    Uuid,
    Json,
    Binary,
    /// Foreign-key-like field; values are the target's primary-key value.
    Reference { target: String, key: Box<FieldType> },
    Enumeration { choices: Vec<String> },
}

impl FieldType {
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
            FieldType::Date => "date",
            FieldType::Uuid => "uuid",
            FieldType::Json => "json",
            FieldType::Binary => "binary",
            FieldType::Reference { .. } => "reference",
            FieldType::Enumeration { .. } => "enumeration",
        }
    }

    /// Parse a catalog type name. References and enumerations need extra data and are built by the loader.
    pub fn from_scalar_name(name: &str) -> Option<Self> {
        Some(match name {
            "integer" => FieldType::Integer,
            "float" => FieldType::Float,
            "decimal" => FieldType::Decimal,
            "string" => FieldType::String,
            "boolean" => FieldType::Boolean,
            "timestamp" => FieldType::Timestamp,
            "date" => FieldType::Date,
            "uuid" => FieldType::Uuid,
            "json" => FieldType::Json,
            "binary" => FieldType::Binary,
            _ => return None,
        })
    }

    /// Scalar type actually stored: the key type for references, self otherwise.
    pub fn storage_type(&self) -> &FieldType {
        match self {
            FieldType::Reference { key, .. } => key.storage_type(),
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    /// Assigned by the store (identity keys, generated columns); never accepted from clients.
    pub auto_generated: bool,
    pub has_default: bool,
    pub primary_key: bool,
    /// Literal default known to the catalog. `has_default` may be true without one (store-side default).
    pub default: Option<FieldValue>,
    /// Storage column type used for casts (e.g. an enum type name).
    pub column_type: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.into(),
            field_type,
            nullable: false,
            auto_generated: false,
            has_default: false,
            primary_key: false,
            default: None,
            column_type: None,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.field_type.tag()
    }

    /// Must be supplied on create.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.has_default && !self.auto_generated
    }

    /// Binary payloads have no equality semantics at the query surface.
    pub fn is_filterable(&self) -> bool {
        !matches!(self.field_type.storage_type(), FieldType::Binary)
    }
}

/// Metadata for one entity type. Fields are in declaration order; exactly one is the primary key.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDescriptor {
    namespace: String,
    name: String,
    qualified_name: String,
    storage_namespace: String,
    table: String,
    fields: Vec<FieldDescriptor>,
    primary_key: usize,
}

impl TypeDescriptor {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        storage_namespace: impl Into<String>,
        table: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, ConfigError> {
        let namespace = namespace.into();
        let name = name.into();
        let qualified_name = format!("{}.{}", namespace, name);
        let mut keys = fields.iter().enumerate().filter(|(_, f)| f.primary_key);
        let primary_key = match (keys.next(), keys.next()) {
            (Some((idx, _)), None) => idx,
            (None, _) => {
                return Err(ConfigError::InvalidPrimaryKey {
                    entity: qualified_name,
                    reason: "no primary key field".into(),
                })
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidPrimaryKey {
                    entity: qualified_name,
                    reason: "composite primary keys are not supported".into(),
                })
            }
        };
        Ok(TypeDescriptor {
            namespace,
            name,
            qualified_name,
            storage_namespace: storage_namespace.into(),
            table: table.into(),
            fields,
            primary_key,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Schema the table lives in.
    pub fn storage_namespace(&self) -> &str {
        &self.storage_namespace
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.fields[self.primary_key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> FieldDescriptor {
        FieldDescriptor {
            primary_key: true,
            auto_generated: true,
            ..FieldDescriptor::new(name, FieldType::Integer)
        }
    }

    #[test]
    fn requires_exactly_one_primary_key() {
        let none = TypeDescriptor::new("app", "User", "app", "user", vec![]);
        assert!(matches!(none, Err(ConfigError::InvalidPrimaryKey { .. })));

        let two = TypeDescriptor::new("app", "User", "app", "user", vec![key("a"), key("b")]);
        assert!(matches!(two, Err(ConfigError::InvalidPrimaryKey { .. })));

        let one = TypeDescriptor::new(
            "app",
            "User",
            "app",
            "user",
            vec![FieldDescriptor::new("email", FieldType::String), key("id")],
        )
        .unwrap();
        assert_eq!(one.qualified_name(), "app.User");
        assert_eq!(one.primary_key().name, "id");
    }

    #[test]
    fn reference_tag_and_storage_type() {
        let ty = FieldType::Reference {
            target: "app.User".into(),
            key: Box::new(FieldType::Uuid),
        };
        assert_eq!(ty.tag(), "reference");
        assert_eq!(ty.storage_type(), &FieldType::Uuid);
    }

    #[test]
    fn required_and_filterable() {
        let mut f = FieldDescriptor::new("blob", FieldType::Binary);
        assert!(f.is_required());
        assert!(!f.is_filterable());
        f.nullable = true;
        assert!(!f.is_required());
        assert!(key("id").is_filterable());
        assert!(!key("id").is_required());
    }
}
