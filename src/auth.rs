//! Request authentication and permission checks, applied before any gateway operation.
//!
//! Authenticators run in order and the first one that recognizes the request
//! names the caller; nobody recognized means anonymous. Every permission check
//! must then pass for the operation to proceed.

use crate::error::{AppError, ConfigError};
use crate::settings::Settings;
use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::fmt;

pub const REMOTE_USER_HEADER: &str = "X-Remote-User";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    User(String),
}

impl Principal {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User(_))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Anonymous => f.write_str("anonymous"),
            Principal::User(name) => f.write_str(name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    ListEntities,
    Describe,
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Operation::ListEntities | Operation::Describe | Operation::List | Operation::Read
        )
    }

    pub fn is_schema(self) -> bool {
        matches!(self, Operation::ListEntities | Operation::Describe)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ListEntities => "list_entities",
            Operation::Describe => "describe",
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// What a permission check gets to look at.
#[derive(Clone, Copy, Debug)]
pub struct AccessRequest<'a> {
    pub principal: &'a Principal,
    pub operation: Operation,
    /// Namespace or qualified entity name.
    pub target: &'a str,
}

pub trait Authenticator: Send + Sync {
    fn name(&self) -> &'static str;
    /// The caller, or None when this mechanism does not recognize the request.
    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal>;
}

pub trait PermissionCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn allows(&self, request: &AccessRequest<'_>) -> bool;
}

/// `Authorization: Bearer <token>` against a fixed token table.
pub struct TokenAuth {
    tokens: HashMap<String, String>,
}

impl TokenAuth {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        TokenAuth {
            tokens: pairs.into_iter().map(|(principal, token)| (token, principal)).collect(),
        }
    }
}

impl Authenticator for TokenAuth {
    fn name(&self) -> &'static str {
        "token"
    }

    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        self.tokens.get(token).cloned().map(Principal::User)
    }
}

/// Trusts a fronting proxy's `X-Remote-User` header.
pub struct RemoteUserAuth;

impl Authenticator for RemoteUserAuth {
    fn name(&self) -> &'static str {
        "remote_user"
    }

    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        headers
            .get(REMOTE_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Principal::User(s.to_string()))
    }
}

pub struct AllowAny;

impl PermissionCheck for AllowAny {
    fn name(&self) -> &'static str {
        "allow_any"
    }

    fn allows(&self, _request: &AccessRequest<'_>) -> bool {
        true
    }
}

pub struct Authenticated;

impl PermissionCheck for Authenticated {
    fn name(&self) -> &'static str {
        "authenticated"
    }

    fn allows(&self, request: &AccessRequest<'_>) -> bool {
        request.principal.is_authenticated()
    }
}

pub struct AuthenticatedOrReadOnly;

impl PermissionCheck for AuthenticatedOrReadOnly {
    fn name(&self) -> &'static str {
        "authenticated_or_read_only"
    }

    fn allows(&self, request: &AccessRequest<'_>) -> bool {
        request.operation.is_read_only() || request.principal.is_authenticated()
    }
}

pub struct ReadOnly;

impl PermissionCheck for ReadOnly {
    fn name(&self) -> &'static str {
        "read_only"
    }

    fn allows(&self, request: &AccessRequest<'_>) -> bool {
        request.operation.is_read_only()
    }
}

pub struct AuthPolicy {
    authenticators: Vec<Box<dyn Authenticator>>,
    checks: Vec<Box<dyn PermissionCheck>>,
    public_schema: bool,
}

impl AuthPolicy {
    pub fn new(
        authenticators: Vec<Box<dyn Authenticator>>,
        checks: Vec<Box<dyn PermissionCheck>>,
        public_schema: bool,
    ) -> Self {
        AuthPolicy {
            authenticators,
            checks,
            public_schema,
        }
    }

    /// No authenticators, every operation allowed.
    pub fn allow_all() -> Self {
        Self::new(Vec::new(), vec![Box::new(AllowAny) as Box<dyn PermissionCheck>], true)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let mut authenticators: Vec<Box<dyn Authenticator>> = Vec::with_capacity(settings.auth.len());
        for name in &settings.auth {
            let authenticator: Box<dyn Authenticator> = match name.as_str() {
                "token" => Box::new(TokenAuth::new(settings.api_tokens.iter().cloned())),
                "remote_user" => Box::new(RemoteUserAuth),
                other => {
                    return Err(ConfigError::Validation(format!(
                        "unknown authentication mechanism: {}",
                        other
                    )))
                }
            };
            authenticators.push(authenticator);
        }
        let mut checks: Vec<Box<dyn PermissionCheck>> = Vec::with_capacity(settings.permissions.len());
        for name in &settings.permissions {
            let check: Box<dyn PermissionCheck> = match name.as_str() {
                "allow_any" => Box::new(AllowAny),
                "authenticated" => Box::new(Authenticated),
                "authenticated_or_read_only" => Box::new(AuthenticatedOrReadOnly),
                "read_only" => Box::new(ReadOnly),
                other => {
                    return Err(ConfigError::Validation(format!("unknown permission check: {}", other)))
                }
            };
            checks.push(check);
        }
        tracing::info!(
            authenticators = ?authenticators.iter().map(|a| a.name()).collect::<Vec<_>>(),
            permissions = ?checks.iter().map(|c| c.name()).collect::<Vec<_>>(),
            public_schema = settings.public_schema,
            "auth policy"
        );
        Ok(Self::new(authenticators, checks, settings.public_schema))
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Principal {
        self.authenticators
            .iter()
            .find_map(|a| a.authenticate(headers))
            .unwrap_or(Principal::Anonymous)
    }

    pub fn authorize(&self, principal: &Principal, operation: Operation, target: &str) -> Result<(), AppError> {
        if self.public_schema && operation.is_schema() {
            return Ok(());
        }
        let request = AccessRequest {
            principal,
            operation,
            target,
        };
        if let Some(check) = self.checks.iter().find(|c| !c.allows(&request)) {
            tracing::debug!(principal = %principal, operation = operation.as_str(), target, check = check.name(), "denied");
            let message = format!("{} on {}", operation.as_str(), target);
            return Err(match principal {
                Principal::Anonymous => AppError::Unauthenticated(message),
                Principal::User(_) => AppError::PermissionDenied(message),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPolicy")
            .field("authenticators", &self.authenticators.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("checks", &self.checks.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("public_schema", &self.public_schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy(auth: &[&str], permissions: &[&str], public_schema: bool) -> AuthPolicy {
        let settings = Settings {
            auth: auth.iter().map(|s| s.to_string()).collect(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
            api_tokens: vec![("alice".into(), "s3cret".into())],
            public_schema,
            ..Settings::default()
        };
        AuthPolicy::from_settings(&settings).unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn first_recognizing_authenticator_wins() {
        let p = policy(&["token", "remote_user"], &["allow_any"], true);
        let both = headers(&[("authorization", "Bearer s3cret"), ("x-remote-user", "bob")]);
        assert_eq!(p.authenticate(&both), Principal::User("alice".into()));

        let wrong_token = headers(&[("authorization", "Bearer nope"), ("x-remote-user", "bob")]);
        assert_eq!(p.authenticate(&wrong_token), Principal::User("bob".into()));

        assert_eq!(p.authenticate(&HeaderMap::new()), Principal::Anonymous);
    }

    #[test]
    fn anonymous_failures_are_unauthenticated_others_forbidden() {
        let p = policy(&["remote_user"], &["authenticated_or_read_only", "read_only"], false);
        p.authorize(&Principal::Anonymous, Operation::List, "app.User").unwrap();
        assert!(matches!(
            p.authorize(&Principal::Anonymous, Operation::Create, "app.User"),
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            p.authorize(&Principal::User("bob".into()), Operation::Delete, "app.User"),
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[test]
    fn public_schema_skips_checks() {
        let p = policy(&[], &["authenticated"], true);
        p.authorize(&Principal::Anonymous, Operation::Describe, "app.User").unwrap();
        assert!(p.authorize(&Principal::Anonymous, Operation::Read, "app.User").is_err());

        let closed = policy(&[], &["authenticated"], false);
        assert!(closed.authorize(&Principal::Anonymous, Operation::ListEntities, "app").is_err());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let settings = Settings {
            auth: vec!["kerberos".into()],
            ..Settings::default()
        };
        assert!(matches!(AuthPolicy::from_settings(&settings), Err(ConfigError::Validation(_))));

        let settings = Settings {
            permissions: vec!["admins_only".into()],
            ..Settings::default()
        };
        assert!(AuthPolicy::from_settings(&settings).is_err());
    }
}
