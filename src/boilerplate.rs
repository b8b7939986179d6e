//! Blocking database wrapper

use std::ops::{Deref, DerefMut};

use futures::StreamExt;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::ConnectionConfig;
use crate::engine::EngineSpec;
use crate::error::Error;
use crate::pool::DatabasePool;
use crate::row::Row;
use crate::stream::RowStream;

/// Blocking wrapper owning a connection pool to a SQLite or PostgreSQL database.
///
/// Every method blocks the calling thread until the database answers. The
/// wrapper drives sqlx on a private single-threaded tokio runtime, so it must
/// not be used from inside an async runtime; use
/// [`AsyncBoilerplate`](crate::AsyncBoilerplate) there instead.
///
/// The wrapper is either disconnected or connected. [`connect`](Self::connect)
/// and [`disconnect`](Self::disconnect) are the only transitions, and
/// [`execute`](Self::execute) fails with [`Error::NotConnected`] while
/// disconnected.
///
/// # Example
///
/// ```no_run
/// use sqlx_boilerplate::{Boilerplate, ConnectionConfig};
///
/// # fn example() -> sqlx_boilerplate::Result<()> {
/// // Callable style: construct and connect in one expression
/// let db = Boilerplate::new(ConnectionConfig::new("sqlite://"))?.open()?;
///
/// for row in db.execute("SELECT date('1982-10-26')")? {
///    println!("{:?}", row?.values());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Boilerplate {
   config: ConnectionConfig,
   engine: EngineSpec,
   /// Present while connected
   pool: Option<DatabasePool>,
   runtime: Runtime,
}

impl Boilerplate {
   /// Validate `config` and build a disconnected wrapper.
   ///
   /// No connection is opened until [`connect`](Self::connect) is called.
   pub fn new(config: ConnectionConfig) -> Result<Self> {
      let engine = EngineSpec::from_config(&config)?;
      let runtime = tokio::runtime::Builder::new_current_thread()
         .enable_all()
         .build()?;

      Ok(Self {
         config,
         engine,
         pool: None,
         runtime,
      })
   }

   /// Connect and return the wrapper, for `let db = Boilerplate::new(config)?.open()?;`.
   pub fn open(mut self) -> Result<Self> {
      self.connect()?;
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
   /// Does nothing when already connected. Use [`reconnect`](Self::reconnect)
   /// to replace an existing pool.
   pub fn connect(&mut self) -> Result<()> {
      if self.pool.is_some() {
         debug!("Already connected, keeping existing pool");
         return Ok(());
      }

      let pool = self.runtime.block_on(self.engine.connect(&self.config))?;
      self.pool = Some(pool);
      Ok(())
   }

   /// Close the current pool, if any, and open a new one.
   pub fn reconnect(&mut self) -> Result<()> {
      self.disconnect();
      self.connect()
   }

   /// Close the connection pool.
   ///
   /// Safe to call when already disconnected, in which case it does nothing.
   pub fn disconnect(&mut self) {
      match self.pool.take() {
         Some(pool) => {
            self.runtime.block_on(pool.close());
            info!("Disconnected from database");
         }
         None => debug!("Disconnect requested while not connected"),
      }
   }

   /// Run `statement` and return its rows lazily.
   ///
   /// Rows are fetched one at a time as the iterator advances. Errors from the
   /// statement itself are yielded by the iterator, after which it ends.
   ///
   /// # Errors
   ///
   /// Returns [`Error::NotConnected`] if called before [`connect`](Self::connect)
   /// or after [`disconnect`](Self::disconnect).
   pub fn execute<'a>(&'a self, statement: &'a str) -> Result<Rows<'a>> {
      let pool = self.pool.as_ref().ok_or(Error::NotConnected)?;
      self.engine.echo(statement);

      Ok(Rows {
         runtime: &self.runtime,
         stream: Some(RowStream::new(pool, statement)),
      })
   }

   /// Run `statement` and collect every row.
   pub fn fetch_all(&self, statement: &str) -> Result<Vec<Row>> {
      self.execute(statement)?.collect()
   }

   /// Run `statement` and return its only row, if any.
   ///
   /// # Errors
   ///
   /// Returns [`Error::MultipleRowsReturned`] if the statement yields more than one row.
   pub fn fetch_one(&self, statement: &str) -> Result<Option<Row>> {
      let mut rows = self.fetch_all(statement)?;
      match rows.len() {
         0 | 1 => Ok(rows.pop()),
         count => Err(Error::MultipleRowsReturned(count)),
      }
   }

   /// Connect and return a guard that disconnects when dropped.
   ///
   /// The guard derefs to the wrapper. Disconnect runs on every exit from the
   /// guard's scope, including early returns and panics.
   ///
   /// ```no_run
   /// use sqlx_boilerplate::{Boilerplate, ConnectionConfig};
   ///
   /// # fn example() -> sqlx_boilerplate::Result<()> {
   /// let mut db = Boilerplate::new(ConnectionConfig::new("sqlite://"))?;
   /// {
   ///    let db = db.scoped()?;
   ///    let rows = db.fetch_all("SELECT 1")?;
   ///    assert_eq!(rows.len(), 1);
   /// }
   /// assert!(!db.is_connected());
   /// # Ok(())
   /// # }
   /// ```
   pub fn scoped(&mut self) -> Result<ConnectionGuard<'_>> {
      self.connect()?;
      Ok(ConnectionGuard { db: self })
   }

   /// Connect, run `body`, then disconnect whatever `body` returned.
   pub fn with_connection<T, E, F>(&mut self, body: F) -> std::result::Result<T, E>
   where
      F: FnOnce(&mut Boilerplate) -> std::result::Result<T, E>,
      E: From<Error>,
   {
      let mut guard = self.scoped()?;
      body(&mut *guard)
   }
}

impl std::fmt::Debug for Boilerplate {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Boilerplate")
         .field("backend", &self.engine.backend)
         .field("connected", &self.is_connected())
         .finish()
   }
}

impl Drop for Boilerplate {
   fn drop(&mut self) {
      if let Some(pool) = self.pool.take() {
         warn!("Boilerplate dropped while connected, releasing pool without closing it");
         // Pooled connections hand themselves back via the runtime
         let _enter = self.runtime.enter();
         drop(pool);
      }
   }
}

/// Lazy iterator over the rows of one statement, returned by
/// [`Boilerplate::execute`].
///
/// Single-pass: once exhausted (or after an error) it keeps returning `None`.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Rows<'a> {
   runtime: &'a Runtime,
   stream: Option<RowStream<'a>>,
}

impl std::fmt::Debug for Rows<'_> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Rows")
         .field("exhausted", &self.stream.is_none())
         .finish_non_exhaustive()
   }
}

impl Iterator for Rows<'_> {
   type Item = Result<Row>;

   fn next(&mut self) -> Option<Self::Item> {
      let stream = self.stream.as_mut()?;
      let next = self.runtime.block_on(stream.next());
      if next.is_none() {
         let _enter = self.runtime.enter();
         self.stream = None;
      }
      next
   }
}

impl Drop for Rows<'_> {
   fn drop(&mut self) {
      // A half-consumed stream still holds a pooled connection, whose drop
      // needs a runtime context
      if let Some(stream) = self.stream.take() {
         let _enter = self.runtime.enter();
         drop(stream);
      }
   }
}

/// Connected [`Boilerplate`] that disconnects on drop.
///
/// Returned by [`Boilerplate::scoped`].
#[must_use = "if unused, the connection is immediately closed"]
pub struct ConnectionGuard<'a> {
   db: &'a mut Boilerplate,
}

impl Deref for ConnectionGuard<'_> {
   type Target = Boilerplate;

   fn deref(&self) -> &Self::Target {
      self.db
   }
}

impl DerefMut for ConnectionGuard<'_> {
   fn deref_mut(&mut self) -> &mut Self::Target {
      self.db
   }
}

impl Drop for ConnectionGuard<'_> {
   fn drop(&mut self) {
      self.db.disconnect();
   }
}
