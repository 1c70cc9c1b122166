use std::env;
use std::num::{NonZeroU32, ParseIntError};
use std::time::Duration;

use nutype::nutype;
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

/// Maximum number of database connections in the pool.
///
/// MaxConnections represents the connection pool size limit. It must be at least 1,
/// enforced by using NonZeroU32 as the underlying type.
///
/// # Examples
///
/// ```ignore
/// use moviecore_postgres::MaxConnections;
/// use std::num::NonZeroU32;
///
/// let small_pool = MaxConnections::new(NonZeroU32::new(5).expect("5 is non-zero"));
/// let large_pool = MaxConnections::new(NonZeroU32::new(50).expect("50 is non-zero"));
/// ```
#[nutype(derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRef, Into))]
pub struct MaxConnections(NonZeroU32);

/// Configuration for the PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Maximum number of connections in the pool (default: 10)
    pub max_connections: MaxConnections,
    /// Timeout for acquiring a connection from the pool (default: 30 seconds)
    pub acquire_timeout: Duration,
    /// Idle timeout for connections in the pool (default: 10 minutes)
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        const DEFAULT_MAX_CONNECTIONS: NonZeroU32 = match NonZeroU32::new(10) {
            Some(v) => v,
            None => unreachable!(),
        };

        Self {
            max_connections: MaxConnections::new(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}

/// Environment settings that could not be turned into [`DatabaseSettings`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `DB_PORT` is not a valid TCP port.
    #[error("DB_PORT must be a port number, got `{value}`")]
    InvalidPort {
        /// The raw value as read.
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Where to find the database, as read from the process environment.
///
/// | Variable      | Default        |
/// |---------------|----------------|
/// | `DB_HOST`     | `localhost`    |
/// | `DB_PORT`     | `5432`         |
/// | `DB_USER`     | `postgres`     |
/// | `DB_PASSWORD` | `password`     |
/// | `DB_NAME`     | `movieexample` |
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login role.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl DatabaseSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup, falling back to defaults
    /// for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let raw_port = value_or("DB_PORT", "5432");
        let port = raw_port
            .trim()
            .parse::<u16>()
            .map_err(|source| ConfigError::InvalidPort {
                value: raw_port.clone(),
                source,
            })?;

        Ok(Self {
            host: value_or("DB_HOST", "localhost"),
            port,
            user: value_or("DB_USER", "postgres"),
            password: value_or("DB_PASSWORD", "password"),
            database: value_or("DB_NAME", "movieexample"),
        })
    }

    /// Structured connect options for these settings.
    ///
    /// Every field is passed through as-is, so passwords and names may hold
    /// characters such as `@`, `/` or `#` that a hand-built URL would mangle.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_pool_config_matches_documented_values() {
        let config = PostgresConfig::default();

        assert_eq!(u32::from(NonZeroU32::from(config.max_connections)), 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(600));
    }

    #[test]
    fn missing_variables_fall_back_to_defaults() {
        let settings = DatabaseSettings::from_lookup(|_| None).unwrap();

        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 5432);
        assert_eq!(settings.user, "postgres");
        assert_eq!(settings.password, "password");
        assert_eq!(settings.database, "movieexample");
    }

    #[test]
    fn variables_override_defaults() {
        let settings = DatabaseSettings::from_lookup(lookup_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_USER", "movies"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_NAME", "catalog"),
        ]))
        .unwrap();

        let options = settings.connect_options();

        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "movies");
        assert_eq!(options.get_database(), Some("catalog"));
    }

    #[test]
    fn reserved_characters_in_password_do_not_leak_into_address() {
        let settings =
            DatabaseSettings::from_lookup(lookup_from(&[("DB_PASSWORD", "p@ss/w#rd")])).unwrap();

        let options = settings.connect_options();

        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("movieexample"));
    }

    #[test]
    fn unparsable_port_is_a_typed_error() {
        let result = DatabaseSettings::from_lookup(lookup_from(&[("DB_PORT", "not-a-port")]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidPort { ref value, .. }) if value == "not-a-port"
        ));
    }

    #[test]
    fn debug_output_redacts_password() {
        let settings =
            DatabaseSettings::from_lookup(lookup_from(&[("DB_PASSWORD", "hunter2")])).unwrap();

        let rendered = format!("{settings:?}");

        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
