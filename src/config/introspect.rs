//! Build a catalog by scanning PostgreSQL's information_schema for the given schemas.

use crate::case::to_pascal_case;
use crate::config::{CatalogConfig, EntityConfig, FieldConfig, NamespaceConfig};
use crate::error::ConfigError;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap, HashSet};

const COLUMNS_SQL: &str = r#"
    SELECT c.table_name::text, c.column_name::text, c.data_type::text,
           c.udt_schema::text, c.udt_name::text, c.is_nullable::text,
           c.column_default::text, c.is_identity::text, c.is_generated::text
    FROM information_schema.columns c
    JOIN information_schema.tables t
      ON t.table_schema = c.table_schema AND t.table_name = c.table_name
    WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
    ORDER BY c.table_name, c.ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
    SELECT kcu.table_name::text, kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
    WHERE tc.table_schema = $1 AND tc.constraint_type = 'PRIMARY KEY'
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT kcu.table_name::text, kcu.column_name::text, ccu.table_schema::text, ccu.table_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.constraint_schema
    WHERE tc.table_schema = $1 AND tc.constraint_type = 'FOREIGN KEY'
"#;

const ENUMS_SQL: &str = r#"
    SELECT n.nspname::text, t.typname::text, e.enumlabel::text
    FROM pg_type t
    JOIN pg_enum e ON e.enumtypid = t.oid
    JOIN pg_namespace n ON n.oid = t.typnamespace
    ORDER BY n.nspname, t.typname, e.enumsortorder
"#;

/// One row of information_schema.columns.
#[derive(Clone, Debug)]
pub struct ColumnRow {
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub udt_schema: String,
    pub udt_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub identity: bool,
    pub generated: bool,
}

/// Everything scanned for one schema.
#[derive(Debug, Default)]
pub struct SchemaScan {
    pub columns: Vec<ColumnRow>,
    pub primary_keys: HashMap<String, Vec<String>>,
    /// (table, column) -> (target schema, target table)
    pub foreign_keys: HashMap<(String, String), (String, String)>,
}

fn load_error(e: sqlx::Error) -> ConfigError {
    ConfigError::Load(e.to_string())
}

async fn scan_schema(pool: &PgPool, schema: &str) -> Result<SchemaScan, ConfigError> {
    tracing::debug!(schema, "introspecting");
    let columns = sqlx::query_as::<
        _,
        (String, String, String, String, String, String, Option<String>, String, String),
    >(COLUMNS_SQL)
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(load_error)?
    .into_iter()
    .map(
        |(table, column, data_type, udt_schema, udt_name, nullable, default, identity, generated)| ColumnRow {
            table,
            column,
            data_type,
            udt_schema,
            udt_name,
            nullable: nullable == "YES",
            default,
            identity: identity == "YES",
            generated: generated == "ALWAYS",
        },
    )
    .collect();

    let mut primary_keys: HashMap<String, Vec<String>> = HashMap::new();
    for (table, column) in sqlx::query_as::<_, (String, String)>(PRIMARY_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(load_error)?
    {
        primary_keys.entry(table).or_default().push(column);
    }

    let foreign_keys = sqlx::query_as::<_, (String, String, String, String)>(FOREIGN_KEYS_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(load_error)?
        .into_iter()
        .map(|(table, column, target_schema, target_table)| ((table, column), (target_schema, target_table)))
        .collect();

    Ok(SchemaScan {
        columns,
        primary_keys,
        foreign_keys,
    })
}

/// Scan `schemas` and build a catalog: one namespace per schema, one entity per table.
pub async fn introspect_pool(pool: &PgPool, schemas: &[String]) -> Result<CatalogConfig, ConfigError> {
    let mut enums: HashMap<(String, String), Vec<String>> = HashMap::new();
    for (schema, name, label) in sqlx::query_as::<_, (String, String, String)>(ENUMS_SQL)
        .fetch_all(pool)
        .await
        .map_err(load_error)?
    {
        enums.entry((schema, name)).or_default().push(label);
    }

    let mut scans = Vec::with_capacity(schemas.len());
    for schema in schemas {
        scans.push((schema.clone(), scan_schema(pool, schema).await?));
    }
    Ok(build_catalog(&scans, &enums))
}

/// Scalar catalog type for a column, or None when unsupported.
fn column_type_name(col: &ColumnRow) -> Option<&'static str> {
    Some(match col.data_type.as_str() {
        "smallint" | "integer" | "bigint" => "integer",
        "real" | "double precision" => "float",
        "numeric" => "decimal",
        "text" | "character varying" | "character" | "citext" => "string",
        "boolean" => "boolean",
        "timestamp with time zone" | "timestamp without time zone" => "timestamp",
        "date" => "date",
        "uuid" => "uuid",
        "json" | "jsonb" => "json",
        "bytea" => "binary",
        _ => return None,
    })
}

fn quote_type(schema: &str, name: &str) -> String {
    format!("\"{}\".\"{}\"", schema.replace('"', "\"\""), name.replace('"', "\"\""))
}

/// Primary key column of `table` when it is a single column of a supported type.
fn usable_primary_key<'a>(
    scan: &'a SchemaScan,
    table: &str,
    enums: &HashMap<(String, String), Vec<String>>,
) -> Option<&'a ColumnRow> {
    let [pk] = scan.primary_keys.get(table)?.as_slice() else {
        return None;
    };
    let col = scan.columns.iter().find(|c| c.table == table && &c.column == pk)?;
    let supported = column_type_name(col).is_some()
        || enums.contains_key(&(col.udt_schema.clone(), col.udt_name.clone()));
    supported.then_some(col)
}

pub fn build_catalog(
    scans: &[(String, SchemaScan)],
    enums: &HashMap<(String, String), Vec<String>>,
) -> CatalogConfig {
    let mut kept: HashSet<(&str, &str)> = HashSet::new();
    for (schema, scan) in scans {
        for col in &scan.columns {
            if usable_primary_key(scan, &col.table, enums).is_some() {
                kept.insert((schema.as_str(), col.table.as_str()));
            }
        }
    }

    let mut namespaces = Vec::with_capacity(scans.len());
    for (schema, scan) in scans {
        let mut tables: BTreeMap<&str, Vec<&ColumnRow>> = BTreeMap::new();
        for col in &scan.columns {
            tables.entry(col.table.as_str()).or_default().push(col);
        }

        let mut entities = Vec::new();
        for (table, columns) in tables {
            let Some(pk) = usable_primary_key(scan, table, enums) else {
                tracing::warn!(schema = %schema, table, "skipping table without a usable single-column primary key");
                continue;
            };
            let mut fields = Vec::with_capacity(columns.len());
            for col in columns {
                let is_pk = col.column == pk.column;
                let mut field = match enums.get(&(col.udt_schema.clone(), col.udt_name.clone())) {
                    Some(choices) if col.data_type == "USER-DEFINED" => FieldConfig {
                        choices: choices.clone(),
                        column_type: Some(quote_type(&col.udt_schema, &col.udt_name)),
                        ..FieldConfig::new(&col.column, "enumeration")
                    },
                    _ => match column_type_name(col) {
                        Some(type_name) => FieldConfig::new(&col.column, type_name),
                        None => {
                            tracing::warn!(schema = %schema, table, column = %col.column, data_type = %col.data_type, "skipping unsupported column");
                            continue;
                        }
                    },
                };
                if col.data_type == "timestamp without time zone" {
                    field.column_type = Some("timestamp".into());
                }
                if !is_pk {
                    if let Some((target_schema, target_table)) =
                        scan.foreign_keys.get(&(col.table.clone(), col.column.clone()))
                    {
                        if kept.contains(&(target_schema.as_str(), target_table.as_str())) {
                            field.target = Some(format!("{}.{}", target_schema, to_pascal_case(target_table)));
                            field.type_ = "reference".into();
                            field.column_type = None;
                            field.choices.clear();
                        }
                    }
                }
                let serial = col
                    .default
                    .as_deref()
                    .map(|d| d.starts_with("nextval("))
                    .unwrap_or(false);
                field.primary_key = is_pk;
                field.nullable = col.nullable && !is_pk;
                field.auto_generated = col.identity || col.generated || serial;
                field.has_default = col.default.is_some() || col.identity;
                fields.push(field);
            }
            entities.push(EntityConfig {
                name: to_pascal_case(table),
                table: Some(table.to_string()),
                fields,
            });
        }

        namespaces.push(NamespaceConfig {
            name: schema.clone(),
            schema: Some(schema.clone()),
            entities,
        });
    }

    CatalogConfig { namespaces }
}
