//! Backend-specific connection pools

use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::{Executor, PgPool, SqlitePool};
use tracing::debug;

use crate::Result;
use crate::config::TableSchema;
use crate::engine::Backend;
use crate::error::Error;
use crate::row::Row;

/// An open connection pool to one of the supported backends.
///
/// Each variant holds the native sqlx pool, so rows are decoded with the
/// backend's own type information.
///
/// ```no_run
/// use sqlx_boilerplate::{AsyncBoilerplate, ConnectionConfig, DatabasePool};
///
/// # async fn example() -> sqlx_boilerplate::Result<()> {
/// let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
/// let db = AsyncBoilerplate::from_pool(ConnectionConfig::new("sqlite://"), DatabasePool::from(pool))?;
/// assert!(db.is_connected());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub enum DatabasePool {
   Sqlite(SqlitePool),
   Postgres(PgPool),
}

impl DatabasePool {
   pub(crate) fn backend(&self) -> Backend {
      match self {
         DatabasePool::Sqlite(_) => Backend::Sqlite,
         DatabasePool::Postgres(_) => Backend::Postgres,
      }
   }

   /// Close the pool, waiting for checked-out connections to be returned.
   pub async fn close(&self) {
      match self {
         DatabasePool::Sqlite(pool) => pool.close().await,
         DatabasePool::Postgres(pool) => pool.close().await,
      }
   }

   pub fn is_closed(&self) -> bool {
      match self {
         DatabasePool::Sqlite(pool) => pool.is_closed(),
         DatabasePool::Postgres(pool) => pool.is_closed(),
      }
   }

   /// Stream the decoded rows of `statement`.
   ///
   /// The statement is sent unprepared. PostgreSQL then returns every column
   /// in its text form, which is what lets dates, numerics and other types
   /// without a native JSON mapping come back as strings.
   pub(crate) fn fetch<'a>(&'a self, statement: &'a str) -> BoxStream<'a, Result<Row>> {
      match self {
         DatabasePool::Sqlite(pool) => sqlx::raw_sql(statement)
            .fetch(pool)
            .map(|row| row.map_err(Error::Execution).and_then(|row| Row::try_from(&row)))
            .boxed(),
         DatabasePool::Postgres(pool) => sqlx::raw_sql(statement)
            .fetch(pool)
            .map(|row| row.map_err(Error::Execution).and_then(|row| Row::try_from(&row)))
            .boxed(),
      }
   }

   /// Run every declared DDL statement inside a single transaction.
   pub(crate) async fn create_tables(&self, schema: &[TableSchema]) -> Result<()> {
      match self {
         DatabasePool::Sqlite(pool) => {
            let mut tx = pool.begin().await.map_err(Error::Connection)?;
            for table in schema {
               debug!(table = %table.name, "Creating table");
               (&mut *tx)
                  .execute(sqlx::raw_sql(&table.ddl))
                  .await
                  .map_err(|source| ddl_error(table, source))?;
            }
            tx.commit().await.map_err(Error::Connection)
         }
         DatabasePool::Postgres(pool) => {
            let mut tx = pool.begin().await.map_err(Error::Connection)?;
            for table in schema {
               debug!(table = %table.name, "Creating table");
               (&mut *tx)
                  .execute(sqlx::raw_sql(&table.ddl))
                  .await
                  .map_err(|source| ddl_error(table, source))?;
            }
            tx.commit().await.map_err(Error::Connection)
         }
      }
   }
}

fn ddl_error(table: &TableSchema, source: sqlx::Error) -> Error {
   Error::CreateTables {
      table: table.name.clone(),
      source,
   }
}

impl From<SqlitePool> for DatabasePool {
   fn from(pool: SqlitePool) -> Self {
      DatabasePool::Sqlite(pool)
   }
}

impl From<PgPool> for DatabasePool {
   fn from(pool: PgPool) -> Self {
      DatabasePool::Postgres(pool)
   }
}
