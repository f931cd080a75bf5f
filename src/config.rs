//! Runtime settings and store selection.
//!
//! The database URL is parsed once with `url`; its scheme picks the driver:
//! `sqlite:` (`sqlite::memory:`, `sqlite://path/to.db`), `postgres:` /
//! `postgresql:` and `mysql:`. Drivers compiled out by cargo features are
//! reported as configuration errors.

use thiserror::Error;
use url::Url;

#[cfg(any(feature = "sqlite", feature = "postgres", feature = "mysql"))]
use anyhow::Context;

use crate::store::{StoreDriver, DEFAULT_VERSION_TABLE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no database URL given; pass --database-url or set DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("invalid database URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported database URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("the {0} driver is not compiled in; rebuild with --features {0}")]
    DriverDisabled(&'static str),

    #[error("invalid version table name {0:?}: use letters, digits and underscores")]
    InvalidVersionTable(String),
}

impl ConfigError {
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        6
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
    Postgres,
    MySql,
}

impl Driver {
    pub fn from_url(url: &Url) -> Result<Self, ConfigError> {
        match url.scheme() {
            "sqlite" => Ok(Driver::Sqlite),
            "postgres" | "postgresql" => Ok(Driver::Postgres),
            "mysql" | "mariadb" => Ok(Driver::MySql),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
            Driver::Postgres => "postgres",
            Driver::MySql => "mysql",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Url,
    pub version_table: String,
    /// Take the store's advisory lock around mutating commands.
    pub lock: bool,
}

impl Settings {
    pub fn new(database_url: Option<String>, version_table: Option<String>) -> Result<Self, ConfigError> {
        let raw = database_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;
        let database_url = Url::parse(raw.trim())?;
        Driver::from_url(&database_url)?;

        let version_table = version_table.unwrap_or_else(|| DEFAULT_VERSION_TABLE.to_string());
        validate_table_name(&version_table)?;

        Ok(Self {
            database_url,
            version_table,
            lock: true,
        })
    }

    pub fn without_lock(mut self) -> Self {
        self.lock = false;
        self
    }

    pub fn driver(&self) -> Result<Driver, ConfigError> {
        Driver::from_url(&self.database_url)
    }

    /// The URL with any password replaced, safe to log.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.database_url)
    }
}

fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidVersionTable(name.to_string()))
    }
}

fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    if url.password().is_some() && redacted.set_password(Some("***")).is_ok() {
        return redacted.to_string();
    }
    url.to_string()
}

/// File path for a `sqlite:` URL; `None` for an in-memory database.
///
/// `sqlite://data/app.db` is relative (the first segment parses as the
/// host), `sqlite:///var/lib/app.db` is absolute and `sqlite:app.db` is
/// relative to the working directory.
pub fn sqlite_path(url: &Url) -> Option<String> {
    if url.scheme() != "sqlite" {
        return None;
    }
    let path = match url.host_str() {
        Some(host) => format!("{}{}", host, url.path()),
        None => url.path().to_string(),
    };
    match path.as_str() {
        "" | ":memory:" => None,
        _ => Some(path),
    }
}

/// Connect to the configured database and ensure its version table.
pub fn open_store(settings: &Settings) -> anyhow::Result<Box<dyn StoreDriver>> {
    let driver = settings.driver()?;
    tracing::debug!(driver = driver.name(), url = %settings.redacted_url(), "Opening store");

    match driver {
        #[cfg(feature = "sqlite")]
        Driver::Sqlite => {
            let conn = match sqlite_path(&settings.database_url) {
                Some(path) => rusqlite::Connection::open(path),
                None => rusqlite::Connection::open_in_memory(),
            }
            .map_err(crate::error::StoreError::from)
            .with_context(|| format!("open {}", settings.redacted_url()))?;
            let store = crate::store::SqliteStore::with_version_table(conn, &settings.version_table)?;
            Ok(Box::new(store))
        }

        #[cfg(feature = "postgres")]
        Driver::Postgres => {
            let client = postgres::Client::connect(settings.database_url.as_str(), postgres::NoTls)
                .map_err(crate::error::StoreError::from)
                .with_context(|| format!("connect to {}", settings.redacted_url()))?;
            let store = crate::store::PostgresStore::with_version_table(client, &settings.version_table)?;
            Ok(Box::new(store))
        }

        #[cfg(feature = "mysql")]
        Driver::MySql => {
            let conn = mysql::Opts::from_url(settings.database_url.as_str())
                .map_err(crate::error::StoreError::from)
                .and_then(|opts| mysql::Conn::new(opts).map_err(crate::error::StoreError::from))
                .with_context(|| format!("connect to {}", settings.redacted_url()))?;
            let store = crate::store::MySqlStore::with_version_table(conn, &settings.version_table)?;
            Ok(Box::new(store))
        }

        #[allow(unreachable_patterns)]
        other => Err(ConfigError::DriverDisabled(other.name()).into()),
    }
}
