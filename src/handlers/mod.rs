//! HTTP handlers: schema introspection and entity queries.

pub mod query;
pub mod schema;
