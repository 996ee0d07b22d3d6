//! Process settings from environment variables.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub bind: SocketAddr,
    /// PostgreSQL store when set, in-memory store otherwise.
    pub database_url: Option<String>,
    pub catalog_path: Option<PathBuf>,
    /// Schemas to introspect when no catalog file is given.
    pub namespaces: Vec<String>,
    pub max_connections: u32,
    pub body_limit: usize,
    pub auth: Vec<String>,
    pub permissions: Vec<String>,
    /// (principal, token) pairs for bearer authentication.
    pub api_tokens: Vec<(String, String)>,
    /// Schema routes skip permission checks.
    pub public_schema: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            catalog_path: None,
            namespaces: Vec::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            body_limit: DEFAULT_BODY_LIMIT,
            auth: Vec::new(),
            permissions: vec!["allow_any".into()],
            api_tokens: Vec::new(),
            public_schema: true,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        let bind: SocketAddr = get("GATEWAY_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .map_err(|_| invalid("GATEWAY_BIND", "expected host:port"))?;
        let max_connections = match get("GATEWAY_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("GATEWAY_MAX_CONNECTIONS", "expected a positive integer"))?,
            None => defaults.max_connections,
        };
        let body_limit = match get("GATEWAY_BODY_LIMIT") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| invalid("GATEWAY_BODY_LIMIT", "expected a byte count"))?,
            None => defaults.body_limit,
        };
        let public_schema = match get("GATEWAY_PUBLIC_SCHEMA") {
            Some(v) => parse_bool(&v).ok_or_else(|| invalid("GATEWAY_PUBLIC_SCHEMA", "expected true or false"))?,
            None => defaults.public_schema,
        };
        let permissions = get("GATEWAY_PERMISSIONS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.permissions);
        let api_tokens = get("GATEWAY_API_TOKENS")
            .map(|v| parse_tokens(&v))
            .transpose()?
            .unwrap_or_default();

        Ok(Settings {
            bind,
            database_url: get("DATABASE_URL"),
            catalog_path: get("GATEWAY_CATALOG").map(PathBuf::from),
            namespaces: get("GATEWAY_NAMESPACES").map(|v| split_list(&v)).unwrap_or_default(),
            max_connections,
            body_limit,
            auth: get("GATEWAY_AUTH").map(|v| split_list(&v)).unwrap_or_default(),
            permissions,
            api_tokens,
            public_schema,
        })
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Validation(format!("{}: {}", key, reason))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// `alice:secret,bob:hunter2`
fn parse_tokens(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    split_list(raw)
        .into_iter()
        .map(|pair| match pair.split_once(':') {
            Some((principal, token)) if !principal.is_empty() && !token.is_empty() => {
                Ok((principal.to_string(), token.to_string()))
            }
            _ => Err(invalid("GATEWAY_API_TOKENS", "expected principal:token pairs")),
        })
        .collect()
}
