//! Environment-driven configuration.
//!
//! Every value has a default so the loader starts with nothing set. Parsing goes
//! through a lookup function; `from_env` passes the process environment and
//! tests pass a map.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_RECIPIENT_LEN: usize = 100;

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn lookup_bool(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn lookup_usize(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn lookup_u16(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: u16) -> u16 {
    lookup(key)
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

fn lookup_duration_millis(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default_millis: u64,
) -> Duration {
    lookup(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn lookup_string(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// What to load and how to shape it.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub csv_path: PathBuf,
    pub batch_size: usize,
    pub max_recipient_len: usize,
    pub seed: Option<u64>,
    pub taxonomy_path: Option<PathBuf>,
}

impl LoaderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            csv_path: PathBuf::from(lookup_string(lookup, "LOADER_CSV_PATH", "updated_data.csv")),
            batch_size: lookup_usize(lookup, "LOADER_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
            max_recipient_len: lookup_usize(
                lookup,
                "LOADER_MAX_RECIPIENT_LEN",
                DEFAULT_MAX_RECIPIENT_LEN,
            )
            .max(1),
            seed: lookup("LOADER_SEED").and_then(|value| value.trim().parse::<u64>().ok()),
            taxonomy_path: lookup("LOADER_TAXONOMY_PATH").map(PathBuf::from),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Connection parameters for the target database.
///
/// `url` wins over the individual parts when both are present.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub application_name: String,
    pub connect_timeout: Duration,
    /// Zero disables the server-side statement timeout.
    pub statement_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            url: lookup("DATABASE_URL").filter(|value| !value.trim().is_empty()),
            host: lookup_string(lookup, "DB_HOST", "localhost"),
            port: lookup_u16(lookup, "DB_PORT", 5432),
            user: lookup_string(lookup, "DB_USER", "postgres"),
            password: lookup("DB_PASSWORD"),
            database: lookup_string(lookup, "DB_NAME", "databasepj"),
            application_name: lookup_string(lookup, "DB_APPLICATION_NAME", "mail-loader"),
            connect_timeout: lookup_duration_millis(lookup, "DB_CONNECT_TIMEOUT_MS", 10_000),
            statement_timeout: lookup_duration_millis(lookup, "DB_STATEMENT_TIMEOUT_MS", 0),
        }
    }

    /// Connection target without credentials, for log lines.
    pub fn describe(&self) -> String {
        match &self.url {
            Some(_) => "DATABASE_URL".to_string(),
            None => format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("application_name", &self.application_name)
            .field("connect_timeout", &self.connect_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Session settings applied for the duration of a bulk load transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkLoadSettings {
    /// `synchronous_commit = off` for the run transaction.
    pub async_commit: bool,
    /// `session_replication_role = replica`, which skips foreign-key triggers.
    /// Requires a superuser connection.
    pub disable_triggers: bool,
}

impl BulkLoadSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        Self {
            async_commit: lookup_bool(lookup, "LOADER_ASYNC_COMMIT", true),
            disable_triggers: lookup_bool(lookup, "LOADER_DISABLE_TRIGGERS", false),
        }
    }
}

impl Default for BulkLoadSettings {
    fn default() -> Self {
        Self {
            async_commit: true,
            disable_triggers: false,
        }
    }
}
