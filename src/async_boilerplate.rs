//! Asynchronous database wrapper

use std::future::IntoFuture;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};
use tracing::{debug, error, info};

use crate::Result;
use crate::config::ConnectionConfig;
use crate::engine::EngineSpec;
use crate::error::Error;
use crate::pool::DatabasePool;
use crate::row::Row;
use crate::stream::RowStream;

/// Asynchronous wrapper owning a connection pool to a SQLite or PostgreSQL database.
///
/// Runs on the caller's tokio runtime. `connect`, `disconnect` and every row
/// fetched from [`execute`](Self::execute) are suspension points.
///
/// One instance is meant to be driven by one task at a time. Interleaving
/// several `execute` streams on the same instance is unsupported; with SQLite
/// the second stream waits for the first to release the only connection.
///
/// # Example
///
/// ```no_run
/// use futures::TryStreamExt;
/// use sqlx_boilerplate::{AsyncBoilerplate, ConnectionConfig};
///
/// # async fn example() -> sqlx_boilerplate::Result<()> {
/// // Awaiting the wrapper itself connects it
/// let mut db = AsyncBoilerplate::new(ConnectionConfig::new("sqlite://"))?.await?;
///
/// let mut rows = db.execute("SELECT date('1982-10-26')")?;
/// while let Some(row) = rows.try_next().await? {
///    println!("{:?}", row.values());
/// }
/// drop(rows);
///
/// db.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AsyncBoilerplate {
   config: ConnectionConfig,
   engine: EngineSpec,
   /// Present while connected
   pool: Option<DatabasePool>,
}

impl AsyncBoilerplate {
   /// Validate `config` and build a disconnected wrapper.
   pub fn new(config: ConnectionConfig) -> Result<Self> {
      let engine = EngineSpec::from_config(&config)?;

      Ok(Self {
         config,
         engine,
         pool: None,
      })
   }

   /// Adopt an already open pool.
   ///
   /// The wrapper starts connected, so `connect` does nothing and no tables
   /// are created until [`reconnect`](Self::reconnect) opens a fresh pool from
   /// `config`.
   ///
   /// # Errors
   ///
   /// Returns [`Error::Configuration`] if `config` is invalid or names a
   /// different backend than `pool`.
   pub fn from_pool(config: ConnectionConfig, pool: impl Into<DatabasePool>) -> Result<Self> {
      let pool = pool.into();
      let mut db = Self::new(config)?;

      if pool.backend() != db.engine.backend {
         return Err(Error::Configuration(format!(
            "pool is for {:?} but the url names {:?}",
            pool.backend(),
            db.engine.backend
         )));
      }

      db.pool = Some(pool);
      Ok(db)
   }

   /// Connect and return the wrapper.
   ///
   /// Awaiting the wrapper directly does the same.
   pub async fn open(mut self) -> Result<Self> {
      self.connect().await?;
      Ok(self)
   }

   pub fn config(&self) -> &ConnectionConfig {
      &self.config
   }

   pub fn is_connected(&self) -> bool {
      self.pool.is_some()
   }

   /// Open the connection pool, creating the declared tables if configured.
   ///
   /// Does nothing when already connected.
   pub async fn connect(&mut self) -> Result<()> {
      if self.pool.is_some() {
         debug!("Already connected, keeping existing pool");
         return Ok(());
      }

      self.pool = Some(self.engine.connect(&self.config).await?);
      Ok(())
   }

   /// Close the current pool, if any, and open a new one.
   pub async fn reconnect(&mut self) -> Result<()> {
      self.disconnect().await;
      self.connect().await
   }

   /// Close the connection pool, waiting for its connections to shut down.
   ///
   /// Safe to call when already disconnected, in which case it does nothing.
   pub async fn disconnect(&mut self) {
      match self.pool.take() {
         Some(pool) => {
            pool.close().await;
            info!("Disconnected from database");
         }
         None => debug!("Disconnect requested while not connected"),
      }
   }

   /// Run `statement` and stream its rows.
   ///
   /// Nothing is sent to the database until the stream is first polled.
   ///
   /// # Errors
   ///
   /// Returns [`Error::NotConnected`] if called before [`connect`](Self::connect)
   /// or after [`disconnect`](Self::disconnect).
   pub fn execute<'a>(&'a self, statement: &'a str) -> Result<RowStream<'a>> {
      let pool = self.pool.as_ref().ok_or(Error::NotConnected)?;
      self.engine.echo(statement);
      Ok(RowStream::new(pool, statement))
   }

   /// Run `statement` and collect every row.
   pub async fn fetch_all(&self, statement: &str) -> Result<Vec<Row>> {
      self.execute(statement)?.try_collect().await
   }

   /// Run `statement` and return its only row, if any.
   ///
   /// # Errors
   ///
   /// Returns [`Error::MultipleRowsReturned`] if the statement yields more than one row.
   pub async fn fetch_one(&self, statement: &str) -> Result<Option<Row>> {
      let mut rows = self.fetch_all(statement).await?;
      match rows.len() {
         0 | 1 => Ok(rows.pop()),
         count => Err(Error::MultipleRowsReturned(count)),
      }
   }

   /// Connect, run `body`, then disconnect.
   ///
   /// Disconnect is awaited whether `body` succeeds, returns an error, or
   /// panics. A panic is resumed once the pool is closed.
   ///
   /// ```no_run
   /// use sqlx_boilerplate::{AsyncBoilerplate, ConnectionConfig, Error};
   ///
   /// # async fn example() -> Result<(), Error> {
   /// let mut db = AsyncBoilerplate::new(ConnectionConfig::new("sqlite://"))?;
   ///
   /// let count = db
   ///    .scoped(|db| {
   ///       Box::pin(async move {
   ///          let rows = db.fetch_all("SELECT 1 UNION ALL SELECT 2").await?;
   ///          Ok::<_, Error>(rows.len())
   ///       })
   ///    })
   ///    .await?;
   ///
   /// assert_eq!(count, 2);
   /// assert!(!db.is_connected());
   /// # Ok(())
   /// # }
   /// ```
   pub async fn scoped<T, E, F>(&mut self, body: F) -> std::result::Result<T, E>
   where
      F: for<'c> FnOnce(&'c mut AsyncBoilerplate) -> BoxFuture<'c, std::result::Result<T, E>>,
      E: From<Error>,
   {
      self.connect().await?;

      let this = &mut *self;
      let outcome = AssertUnwindSafe(async move { body(this).await })
         .catch_unwind()
         .await;

      self.disconnect().await;

      match outcome {
         Ok(result) => result,
         Err(panic) => {
            error!("Scoped body panicked, connection closed");
            std::panic::resume_unwind(panic)
         }
      }
   }
}

impl IntoFuture for AsyncBoilerplate {
   type Output = Result<AsyncBoilerplate>;
   type IntoFuture = BoxFuture<'static, Self::Output>;

   fn into_future(self) -> Self::IntoFuture {
      Box::pin(self.open())
   }
}
