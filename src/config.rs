//! Connection parameter resolution.
//!
//! Each field is looked up as an application variable (`DB_*`), then the
//! libpq convention (`PG*`), then a built-in default. Values are not
//! validated here; a bad host or port shows up when the connection is opened.

use crate::result::{ReportError, Result};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_DB_NAME: &str = "duke_restaurants";
pub const DEFAULT_DB_USER: &str = "vscode";
pub const DEFAULT_DB_PASSWORD: &str = "vscode";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: &str = "5432";

/// Resolved database connection descriptor
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    /// Kept as text so a malformed value surfaces at connect time
    pub port: String,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

fn resolve_field(
    lookup: &impl Fn(&str) -> Option<String>,
    app_var: &str,
    driver_var: &str,
    default: &str,
) -> String {
    lookup(app_var)
        .or_else(|| lookup(driver_var))
        .unwrap_or_else(|| default.to_string())
}

impl ConnectionConfig {
    /// Resolve every field through `lookup`, which returns `None` for unset variables
    pub fn resolve_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            dbname: resolve_field(&lookup, "DB_NAME", "PGDATABASE", DEFAULT_DB_NAME),
            user: resolve_field(&lookup, "DB_USER", "PGUSER", DEFAULT_DB_USER),
            password: resolve_field(&lookup, "DB_PASSWORD", "PGPASSWORD", DEFAULT_DB_PASSWORD),
            host: resolve_field(&lookup, "DB_HOST", "PGHOST", DEFAULT_DB_HOST),
            port: resolve_field(&lookup, "DB_PORT", "PGPORT", DEFAULT_DB_PORT),
        }
    }

    /// Resolve from the process environment
    pub fn from_env() -> Self {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    /// Human-readable target, without the password
    pub fn describe(&self) -> String {
        format!("{} at {}:{} as {}", self.dbname, self.host, self.port, self.user)
    }

    /// Build the driver configuration. Fails only when the port is not a number.
    pub fn to_postgres_config(&self) -> Result<tokio_postgres::Config> {
        let port: u16 = self.port.trim().parse().map_err(|_| {
            ReportError::Configuration(format!("invalid port '{}'", self.port))
        })?;

        let mut config = tokio_postgres::Config::new();
        config
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password)
            .host(&self.host)
            .port(port);
        Ok(config)
    }
}

/// Load variables from an optional dotenv file. Missing files are ignored and
/// variables already set in the environment win.
pub fn load_env_file(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded env file");
            Ok(true)
        }
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no env file");
            Ok(false)
        }
        Err(dotenvy::Error::Io(e)) => Err(ReportError::Io(e)),
        Err(e) => Err(ReportError::Configuration(format!(
            "cannot parse {}: {e}",
            path.display()
        ))),
    }
}
