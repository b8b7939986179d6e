//! Connection configuration shared by both wrappers

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A table that is created on connect when
/// [`create_tables`](ConnectionConfig::create_tables) is enabled.
///
/// `ddl` should be idempotent (`CREATE TABLE IF NOT EXISTS ...`) so that
/// connecting to an existing database does not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
   /// Table name, used in logs and errors
   pub name: String,
   /// Statement creating the table
   pub ddl: String,
}

impl TableSchema {
   pub fn new(name: impl Into<String>, ddl: impl Into<String>) -> Self {
      Self {
         name: name.into(),
         ddl: ddl.into(),
      }
   }
}

/// Configuration for a [`Boilerplate`](crate::Boilerplate) or
/// [`AsyncBoilerplate`](crate::AsyncBoilerplate).
///
/// The value is moved into the wrapper at construction and only exposed by
/// shared reference afterwards.
///
/// # Examples
///
/// ```
/// use sqlx_boilerplate::{ConnectionConfig, TableSchema};
///
/// let config = ConnectionConfig::new("sqlite://")
///    .with_create_tables(true)
///    .with_table(TableSchema::new(
///       "tasks",
///       "CREATE TABLE IF NOT EXISTS tasks (id INTEGER PRIMARY KEY, name TEXT)",
///    ))
///    .with_engine_option("acquire_timeout_secs", 5);
///
/// assert!(!config.echo);
/// ```
///
/// The same configuration can be loaded with serde; everything but `url`
/// defaults when absent:
///
/// ```
/// use sqlx_boilerplate::ConnectionConfig;
///
/// let config: ConnectionConfig =
///    serde_json::from_str(r#"{ "url": "sqlite://", "echo": true }"#).unwrap();
/// assert!(config.echo);
/// assert!(!config.create_tables);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
   /// Connection string identifying the database and driver
   ///
   /// Supported schemes are `sqlite` and `postgres`/`postgresql`. `sqlite://`
   /// and `sqlite::memory:` open an in-memory database.
   pub url: String,

   /// Whether executed statements are logged
   ///
   /// Default: false
   #[serde(default)]
   pub echo: bool,

   /// Whether the declared [`schema`](Self::schema) is created on connect
   ///
   /// Default: false
   #[serde(default)]
   pub create_tables: bool,

   /// Tables declared for this database, created in order
   ///
   /// Default: empty
   #[serde(default)]
   pub schema: Vec<TableSchema>,

   /// Extra engine options
   ///
   /// `max_connections`, `min_connections`, `acquire_timeout_secs`,
   /// `idle_timeout_secs`, `max_lifetime_secs` and `test_before_acquire` tune
   /// the connection pool. Any other key is forwarded unchanged to the driver
   /// as a percent-encoded URL query parameter (for example `sslmode` or `mode`).
   ///
   /// Default: empty
   #[serde(default)]
   pub engine_options: IndexMap<String, JsonValue>,
}

impl ConnectionConfig {
   /// Creates a configuration for `url` with every option at its default.
   pub fn new(url: impl Into<String>) -> Self {
      Self {
         url: url.into(),
         echo: false,
         create_tables: false,
         schema: Vec::new(),
         engine_options: IndexMap::new(),
      }
   }

   pub fn with_echo(mut self, echo: bool) -> Self {
      self.echo = echo;
      self
   }

   pub fn with_create_tables(mut self, create_tables: bool) -> Self {
      self.create_tables = create_tables;
      self
   }

   /// Declares a table. Tables are created in declaration order.
   pub fn with_table(mut self, table: TableSchema) -> Self {
      self.schema.push(table);
      self
   }

   /// Sets an engine option, replacing any previous value for `key`.
   pub fn with_engine_option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
      self.engine_options.insert(key.into(), value.into());
      self
   }
}
