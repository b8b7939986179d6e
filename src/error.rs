//! Error types for sqlx-boilerplate

/// Result type alias for wrapper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Callers that only care about "what went wrong" rather than the exact
/// variant can match on this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
   /// Malformed URL or invalid option. Fatal.
   Configuration,
   /// The database could not be reached or rejected the connection. Fatal.
   Connection,
   /// A statement failed, or was issued while disconnected. The caller may
   /// reconnect and retry.
   Execution,
}

/// Errors that may occur when working with a [`Boilerplate`](crate::Boilerplate)
/// or an [`AsyncBoilerplate`](crate::AsyncBoilerplate).
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// The configuration was rejected, either by validation or by the driver.
   #[error("invalid configuration: {0}")]
   Configuration(String),

   /// The database could not be reached, or refused the connection.
   #[error("connection failed: {0}")]
   Connection(#[source] sqlx::Error),

   /// A declared table could not be created during connect.
   #[error("failed to create table '{table}': {source}")]
   CreateTables {
      table: String,
      #[source]
      source: sqlx::Error,
   },

   /// A statement was issued while the wrapper was disconnected.
   #[error("not connected to a database")]
   NotConnected,

   /// A statement failed to run or to stream its rows.
   #[error("execution failed: {0}")]
   Execution(#[source] sqlx::Error),

   /// `fetch_one()` saw more than one row.
   #[error("fetch_one() statement returned {0} rows, expected 0 or 1")]
   MultipleRowsReturned(usize),

   /// Database type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// The runtime backing the blocking wrapper could not be started.
   #[error("runtime error: {0}")]
   Runtime(#[from] std::io::Error),
}

impl Error {
   /// Map a sqlx error raised while opening a pool.
   ///
   /// The driver reports URL problems it detects itself as
   /// `sqlx::Error::Configuration`; those keep their configuration kind.
   pub(crate) fn from_connect(err: sqlx::Error) -> Self {
      match err {
         sqlx::Error::Configuration(inner) => Error::Configuration(inner.to_string()),
         other => Error::Connection(other),
      }
   }

   /// Classify this error.
   pub fn kind(&self) -> ErrorKind {
      match self {
         Error::Configuration(_) => ErrorKind::Configuration,
         Error::Connection(_) | Error::CreateTables { .. } | Error::Runtime(_) => {
            ErrorKind::Connection
         }
         Error::NotConnected
         | Error::Execution(_)
         | Error::MultipleRowsReturned(_)
         | Error::UnsupportedDatatype(_) => ErrorKind::Execution,
      }
   }

   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Execution(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("DB_{}", code);
            }
            "EXECUTION_ERROR".to_string()
         }
         Error::Configuration(_) => "CONFIGURATION_ERROR".to_string(),
         Error::Connection(_) => "CONNECTION_ERROR".to_string(),
         Error::CreateTables { .. } => "CREATE_TABLES_FAILED".to_string(),
         Error::NotConnected => "NOT_CONNECTED".to_string(),
         Error::MultipleRowsReturned(_) => "MULTIPLE_ROWS_RETURNED".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::Runtime(_) => "RUNTIME_ERROR".to_string(),
      }
   }
}
