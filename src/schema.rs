//! Schema introspection: serializable field and entity summaries.

use crate::descriptor::{FieldType, TypeDescriptor};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntitySummary {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: &'static str,
    pub nullable: bool,
    pub auto_created: bool,
    pub has_default: bool,
    pub primary_key: bool,
    /// Target entity of a reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

pub fn describe(descriptor: &TypeDescriptor) -> Vec<FieldSchema> {
    descriptor
        .fields()
        .iter()
        .map(|f| {
            let (from, choices) = match &f.field_type {
                FieldType::Reference { target, .. } => (Some(target.clone()), None),
                FieldType::Enumeration { choices } => (None, Some(choices.clone())),
                _ => (None, None),
            };
            FieldSchema {
                name: f.name.clone(),
                type_tag: f.type_tag(),
                nullable: f.nullable,
                auto_created: f.auto_generated,
                has_default: f.has_default,
                primary_key: f.primary_key,
                from,
                choices,
            }
        })
        .collect()
}

pub fn summarize<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<EntitySummary> {
    names
        .into_iter()
        .map(|name| EntitySummary {
            name: name.to_string(),
        })
        .collect()
}
