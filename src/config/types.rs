//! Raw catalog types matching the JSON catalog file (and produced by database introspection).

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub namespaces: Vec<NamespaceConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub name: String,
    /// Storage schema; defaults to the namespace name.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    /// Storage table; defaults to the snake_case entity name.
    #[serde(default)]
    pub table: Option<String>,
    pub fields: Vec<FieldConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_generated: bool,
    /// Store-side default exists. Implied when `default` is given.
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Reference target: `namespace.Entity`, or `Entity` within the same namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, type_: impl Into<String>) -> Self {
        FieldConfig {
            name: name.into(),
            type_: type_.into(),
            nullable: false,
            primary_key: false,
            auto_generated: false,
            has_default: false,
            default: None,
            target: None,
            choices: Vec::new(),
            column_type: None,
        }
    }
}
