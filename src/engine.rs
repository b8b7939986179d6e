//! Engine construction shared by the blocking and async wrappers
//!
//! Turns a [`ConnectionConfig`] into a validated [`EngineSpec`], and an
//! [`EngineSpec`] into a live [`DatabasePool`] with the declared tables created.

use std::str::FromStr;
use std::time::Duration;

use serde_json::Value as JsonValue;
use sqlx::pool::PoolOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Database, Postgres, Sqlite};
use tracing::{error, info};
use url::Url;
use url::form_urlencoded;

use crate::Result;
use crate::config::ConnectionConfig;
use crate::error::Error;
use crate::pool::DatabasePool;

/// Target of echoed statements
const ECHO_TARGET: &str = "sqlx_boilerplate::echo";

/// Database family selected by the URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backend {
   Sqlite,
   Postgres,
}

/// Pool settings derived from the backend defaults and the engine options
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PoolSettings {
   pub max_connections: u32,
   pub min_connections: u32,
   pub acquire_timeout: Duration,
   pub idle_timeout: Option<Duration>,
   pub max_lifetime: Option<Duration>,
   pub test_before_acquire: bool,
}

impl PoolSettings {
   fn for_backend(backend: Backend) -> Self {
      match backend {
         // One connection that is never reaped. An in-memory database only
         // lives as long as its connection.
         Backend::Sqlite => Self {
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: true,
         },
         Backend::Postgres => Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(10 * 60)),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            test_before_acquire: true,
         },
      }
   }
}

/// Validated, normalised form of a [`ConnectionConfig`]
#[derive(Debug, Clone)]
pub(crate) struct EngineSpec {
   pub backend: Backend,
   /// URL handed to the driver, with passthrough options appended
   pub url: String,
   pub in_memory: bool,
   pub echo: bool,
   pub pool: PoolSettings,
}

impl EngineSpec {
   /// Validate `config` without touching the database.
   pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
      let mut url = DatabaseUrl::parse(&config.url)?;
      let backend = url.backend();
      let in_memory = url.is_in_memory();
      let mut pool = PoolSettings::for_backend(backend);

      for (key, value) in &config.engine_options {
         match key.as_str() {
            "max_connections" => pool.max_connections = as_u32(key, value)?,
            "min_connections" => pool.min_connections = as_u32(key, value)?,
            "acquire_timeout_secs" => pool.acquire_timeout = as_secs(key, value)?,
            "idle_timeout_secs" => pool.idle_timeout = as_optional_secs(key, value)?,
            "max_lifetime_secs" => pool.max_lifetime = as_optional_secs(key, value)?,
            "test_before_acquire" => pool.test_before_acquire = as_bool(key, value)?,
            _ => url.append_option(key, &query_value(key, value)?),
         }
      }

      if backend == Backend::Sqlite && pool.max_connections != 1 {
         return Err(Error::Configuration(format!(
            "sqlite databases use a single connection, max_connections cannot be {}",
            pool.max_connections
         )));
      }

      if in_memory && (pool.idle_timeout.is_some() || pool.max_lifetime.is_some()) {
         return Err(Error::Configuration(
            "in-memory sqlite databases cannot expire their connection".to_string(),
         ));
      }

      if pool.min_connections > pool.max_connections {
         return Err(Error::Configuration(format!(
            "min_connections ({}) exceeds max_connections ({})",
            pool.min_connections, pool.max_connections
         )));
      }

      Ok(Self {
         backend,
         url: url.into_string(),
         in_memory,
         echo: config.echo,
         pool,
      })
   }

   /// Open a pool and, if requested, create the declared tables.
   ///
   /// When table creation fails the new pool is closed before the error is
   /// returned, so the caller never holds a half-initialised engine.
   pub async fn connect(&self, config: &ConnectionConfig) -> Result<DatabasePool> {
      info!(backend = ?self.backend, in_memory = self.in_memory, "Connecting to database");

      let pool = self.open().await.inspect_err(|e| {
         error!("Failed to connect to database: {}", e);
      })?;

      if config.create_tables
         && let Err(e) = pool.create_tables(&config.schema).await
      {
         error!("Failed to create tables: {}", e);
         pool.close().await;
         return Err(e);
      }

      info!("Connected to database");
      Ok(pool)
   }

   async fn open(&self) -> Result<DatabasePool> {
      match self.backend {
         Backend::Sqlite => {
            let mut options =
               SqliteConnectOptions::from_str(&self.url).map_err(Error::from_connect)?;
            if !self.echo {
               options = options.disable_statement_logging();
            }

            let pool = self
               .pool_options::<Sqlite>()
               .connect_with(options)
               .await
               .map_err(Error::from_connect)?;
            Ok(DatabasePool::Sqlite(pool))
         }
         Backend::Postgres => {
            let mut options = PgConnectOptions::from_str(&self.url).map_err(Error::from_connect)?;
            if !self.echo {
               options = options.disable_statement_logging();
            }

            let pool = self
               .pool_options::<Postgres>()
               .connect_with(options)
               .await
               .map_err(Error::from_connect)?;
            Ok(DatabasePool::Postgres(pool))
         }
      }
   }

   fn pool_options<DB: Database>(&self) -> PoolOptions<DB> {
      PoolOptions::new()
         .max_connections(self.pool.max_connections)
         .min_connections(self.pool.min_connections)
         .acquire_timeout(self.pool.acquire_timeout)
         .idle_timeout(self.pool.idle_timeout)
         .max_lifetime(self.pool.max_lifetime)
         .test_before_acquire(self.pool.test_before_acquire)
   }

   /// Log `statement` when echo is enabled.
   pub fn echo(&self, statement: &str) {
      if self.echo {
         info!(target: ECHO_TARGET, "{}", statement);
      }
   }
}

/// A database URL being prepared for the driver.
#[derive(Debug)]
enum DatabaseUrl {
   /// sqlx's sqlite form. Not always a valid URL (`sqlite://:memory:`,
   /// relative paths such as `sqlite://app.db`), so only the query is
   /// form-encoded.
   Sqlite {
      path: String,
      query: String,
      in_memory: bool,
   },
   Postgres(Url),
}

impl DatabaseUrl {
   fn parse(raw: &str) -> Result<Self> {
      if let Some(rest) = raw
         .get(..7)
         .filter(|scheme| scheme.eq_ignore_ascii_case("sqlite:"))
         .map(|scheme| &raw[scheme.len()..])
      {
         let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
         let in_memory = matches!(path, "" | "//" | ":memory:" | "//:memory:");

         return Ok(DatabaseUrl::Sqlite {
            path: if in_memory {
               ":memory:".to_string()
            } else {
               path.to_string()
            },
            query: query.to_string(),
            in_memory,
         });
      }

      let url = Url::parse(raw)
         .map_err(|e| Error::Configuration(format!("invalid database url: {}", e)))?;

      match url.scheme() {
         "postgres" | "postgresql" => Ok(DatabaseUrl::Postgres(url)),
         other => Err(Error::Configuration(format!(
            "database can be either \"sqlite\" or \"postgresql\", not \"{}\"",
            other
         ))),
      }
   }

   fn backend(&self) -> Backend {
      match self {
         DatabaseUrl::Sqlite { .. } => Backend::Sqlite,
         DatabaseUrl::Postgres(_) => Backend::Postgres,
      }
   }

   fn is_in_memory(&self) -> bool {
      matches!(self, DatabaseUrl::Sqlite { in_memory: true, .. })
   }

   /// Append `key=value` to the query, percent-encoding both.
   fn append_option(&mut self, key: &str, value: &str) {
      match self {
         DatabaseUrl::Sqlite { query, .. } => {
            form_urlencoded::Serializer::new(query).append_pair(key, value);
         }
         DatabaseUrl::Postgres(url) => {
            url.query_pairs_mut().append_pair(key, value);
         }
      }
   }

   fn into_string(self) -> String {
      match self {
         DatabaseUrl::Sqlite { path, query, .. } if query.is_empty() => format!("sqlite:{}", path),
         DatabaseUrl::Sqlite { path, query, .. } => format!("sqlite:{}?{}", path, query),
         DatabaseUrl::Postgres(url) => url.into(),
      }
   }
}

fn invalid_option(key: &str, expected: &str, value: &JsonValue) -> Error {
   Error::Configuration(format!(
      "engine option '{}' must be {}, got {}",
      key, expected, value
   ))
}

fn as_u32(key: &str, value: &JsonValue) -> Result<u32> {
   value
      .as_u64()
      .and_then(|v| u32::try_from(v).ok())
      .ok_or_else(|| invalid_option(key, "an unsigned 32-bit integer", value))
}

fn as_secs(key: &str, value: &JsonValue) -> Result<Duration> {
   value
      .as_u64()
      .map(Duration::from_secs)
      .ok_or_else(|| invalid_option(key, "a number of seconds", value))
}

fn as_optional_secs(key: &str, value: &JsonValue) -> Result<Option<Duration>> {
   if value.is_null() {
      return Ok(None);
   }
   value
      .as_u64()
      .map(|secs| Some(Duration::from_secs(secs)))
      .ok_or_else(|| invalid_option(key, "a number of seconds or null", value))
}

fn as_bool(key: &str, value: &JsonValue) -> Result<bool> {
   value
      .as_bool()
      .ok_or_else(|| invalid_option(key, "a boolean", value))
}

fn query_value(key: &str, value: &JsonValue) -> Result<String> {
   match value {
      JsonValue::String(s) => Ok(s.clone()),
      JsonValue::Number(n) => Ok(n.to_string()),
      JsonValue::Bool(b) => Ok(b.to_string()),
      _ => Err(invalid_option(key, "a string, number or boolean", value)),
   }
}
