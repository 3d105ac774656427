use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::types::type_names;

/// Whether the backend should negotiate TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Plain connection
    #[default]
    Disable,
    /// Refuse to talk without TLS
    Require,
}

impl SslMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Require => "require",
        }
    }
}

fn default_port() -> u16 {
    5432
}

/// Parameters handed to [`Backend::connect`](crate::backend::Backend::connect).
///
/// Can be built fluently or deserialized from a config file:
/// ```rust
/// use pg_session::prelude::*;
///
/// let params = ConnectParams::builder()
///     .host("127.0.0.1")
///     .database("test")
///     .username("postgres")
///     .finish();
/// assert_eq!(params.port, 5432);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_mode: SslMode,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            database: None,
            username: None,
            password: None,
            ssl_mode: SslMode::default(),
        }
    }
}

impl ConnectParams {
    #[must_use]
    pub fn builder() -> ConnectParamsBuilder {
        ConnectParamsBuilder::default()
    }

    /// Check that every field a backend needs to dial out is present.
    ///
    /// # Errors
    /// Returns `SessionError::Config` naming the first missing field.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.host.is_none() {
            return Err(SessionError::Config("host is required".to_string()));
        }
        if self.database.is_none() {
            return Err(SessionError::Config("database is required".to_string()));
        }
        if self.username.is_none() {
            return Err(SessionError::Config("username is required".to_string()));
        }
        if self.port == 0 {
            return Err(SessionError::Config("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// libpq-style keyword/value connection string.
    #[must_use]
    pub fn connection_string(&self) -> String {
        let mut parts = Vec::with_capacity(6);
        if let Some(host) = &self.host {
            parts.push(format!("host={host}"));
        }
        parts.push(format!("port={}", self.port));
        if let Some(database) = &self.database {
            parts.push(format!("dbname={database}"));
        }
        if let Some(username) = &self.username {
            parts.push(format!("user={username}"));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={password}"));
        }
        parts.push(format!("sslmode={}", self.ssl_mode.as_str()));
        parts.join(" ")
    }
}

/// Fluent builder for [`ConnectParams`].
#[derive(Debug, Clone, Default)]
pub struct ConnectParamsBuilder {
    params: ConnectParams,
}

impl ConnectParamsBuilder {
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.params.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.params.port = port;
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.params.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.params.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.params.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn require_ssl(mut self) -> Self {
        self.params.ssl_mode = SslMode::Require;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectParams {
        self.params
    }

    /// Finish and validate in one step.
    ///
    /// # Errors
    /// Returns `SessionError::Config` if a required field is missing.
    pub fn build(self) -> Result<ConnectParams, SessionError> {
        let params = self.finish();
        params.validate()?;
        Ok(params)
    }
}

static BUILTIN_TYPES: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        (16, type_names::BOOL),
        (20, type_names::BIGINT),
        (21, type_names::SMALLINT),
        (23, type_names::INTEGER),
        (25, type_names::TEXT),
        (114, type_names::JSON),
        (199, type_names::JSON_ARRAY),
        (1000, type_names::BOOL_ARRAY),
        (700, type_names::REAL),
        (701, type_names::DOUBLE),
        (1002, type_names::CHAR_ARRAY),
        (1005, type_names::SMALLINT_ARRAY),
        (1007, type_names::INTEGER_ARRAY),
        (1009, type_names::TEXT_ARRAY),
        (1014, type_names::BPCHAR_ARRAY),
        (1015, type_names::VARCHAR_ARRAY),
        (1016, type_names::BIGINT_ARRAY),
        (1021, type_names::REAL_ARRAY),
        (1022, type_names::DOUBLE_ARRAY),
        (1042, type_names::CHAR),
        (1043, type_names::VARCHAR),
        (1082, type_names::DATE),
        (1114, type_names::TIMESTAMP),
        (1184, type_names::TIMESTAMPTZ),
        (1186, type_names::INTERVAL),
        (1231, type_names::NUMERIC_ARRAY),
        (1700, type_names::NUMERIC),
        (3802, type_names::JSONB),
        (3807, type_names::JSONB_ARRAY),
    ])
});

/// Type-id to type-name table used when building column descriptors.
///
/// Extension types such as `hstore` get a database-specific OID, so callers
/// register them here instead of the decoder querying the catalog.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    overrides: HashMap<u32, String>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, type_id: u32, type_name: impl Into<String>) -> Self {
        self.overrides.insert(type_id, type_name.into());
        self
    }

    /// Name registered by the caller for this id, if any.
    #[must_use]
    pub fn override_for(&self, type_id: u32) -> Option<&str> {
        self.overrides.get(&type_id).map(String::as_str)
    }

    /// Name of a well-known builtin type id.
    #[must_use]
    pub fn builtin(type_id: u32) -> Option<&'static str> {
        BUILTIN_TYPES.get(&type_id).copied()
    }

    /// Resolve a column's type name: caller override, then the name the
    /// backend reported, then the builtin table. Unknown ids resolve to an
    /// empty name, which the decoder passes through as text.
    #[must_use]
    pub fn resolve(&self, type_id: u32, reported: &str) -> String {
        if let Some(name) = self.override_for(type_id) {
            return name.to_string();
        }
        if !reported.is_empty() {
            return reported.to_string();
        }
        Self::builtin(type_id).unwrap_or_default().to_string()
    }
}

/// Per-session settings that are not connection parameters.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub(crate) types: Arc<TypeRegistry>,
}

impl SessionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type_registry(mut self, types: TypeRegistry) -> Self {
        self.types = Arc::new(types);
        self
    }

    /// Register a single type-id to type-name mapping.
    #[must_use]
    pub fn with_type(mut self, type_id: u32, type_name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.types)
            .overrides
            .insert(type_id, type_name.into());
        self
    }

    #[must_use]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_reports_missing_fields() {
        let err = ConnectParams::builder().host("localhost").build().unwrap_err();
        assert!(matches!(err, SessionError::Config(msg) if msg == "database is required"));
    }

    #[test]
    fn connection_string_includes_ssl_mode() {
        let params = ConnectParams::builder()
            .host("db")
            .port(6543)
            .database("app")
            .username("u")
            .password("p")
            .require_ssl()
            .finish();
        assert_eq!(
            params.connection_string(),
            "host=db port=6543 dbname=app user=u password=p sslmode=require"
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let params: ConnectParams = serde_json::from_str(
            r#"{"host": "localhost", "database": "test", "username": "postgres"}"#,
        )
        .unwrap();
        assert_eq!(params.port, 5432);
        assert_eq!(params.ssl_mode, SslMode::Disable);
        assert!(params.password.is_none());
    }

    #[test]
    fn override_wins_over_reported_name() {
        let registry = TypeRegistry::new().with_type(16_385, "hstore");
        assert_eq!(registry.resolve(16_385, "unknown"), "hstore");
        assert_eq!(registry.resolve(23, "int4"), "int4");
        assert_eq!(registry.resolve(1186, ""), "interval");
        assert_eq!(registry.resolve(99_999, ""), "");
        assert_eq!(registry.resolve(1002, ""), "_char");
    }
}
