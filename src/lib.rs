//! # sqlx-boilerplate
//!
//! Thin connection wrappers around SQLx for SQLite and PostgreSQL, in a
//! blocking and an asynchronous flavour.
//!
//! ## Core Types
//!
//! - **[`Boilerplate`]**: blocking wrapper, drives SQLx on a private runtime
//! - **[`AsyncBoilerplate`]**: asynchronous wrapper for use inside a tokio runtime
//! - **[`ConnectionConfig`]**: immutable connection settings shared by both
//! - **[`Row`]**: driver-independent result row with JSON values
//! - **[`Error`]**: error type for all operations
//!
//! Each wrapper owns at most one connection pool. It starts disconnected;
//! `connect` opens the pool (and creates the declared tables when
//! `create_tables` is set), `disconnect` closes it, and `execute` streams the
//! rows of a statement while connected.
//!
//! ## Usage
//!
//! Three equivalent ways to get a connected wrapper:
//!
//! ```no_run
//! use sqlx_boilerplate::{AsyncBoilerplate, ConnectionConfig, Error, TableSchema};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!    let config = ConnectionConfig::new("sqlite://")
//!       .with_create_tables(true)
//!       .with_table(TableSchema::new(
//!          "tasks",
//!          "CREATE TABLE IF NOT EXISTS tasks (id INTEGER PRIMARY KEY, name TEXT)",
//!       ));
//!
//!    // Explicit connect / disconnect
//!    let mut db = AsyncBoilerplate::new(config.clone())?;
//!    db.connect().await?;
//!    let _count = db.fetch_all("SELECT COUNT(*) FROM tasks").await?;
//!    db.disconnect().await;
//!
//!    // Await the wrapper itself
//!    let mut db = AsyncBoilerplate::new(config.clone())?.await?;
//!    db.disconnect().await;
//!
//!    // Scoped: disconnects on every exit path
//!    let mut db = AsyncBoilerplate::new(config)?;
//!    db.scoped(|db| {
//!       Box::pin(async move {
//!          let row = db.fetch_one("SELECT 1").await?;
//!          Ok::<_, Error>(row)
//!       })
//!    })
//!    .await?;
//!
//!    Ok(())
//! }
//! ```
//!
//! The blocking [`Boilerplate`] has the same shape without `.await`, with
//! [`Boilerplate::open`] for the one-expression form and an RAII
//! [`ConnectionGuard`] for scoped use.
//!
//! ## Design Principles
//!
//! - One wrapper covers both backends, each through its native sqlx driver
//! - Minimal custom logic - delegates to sqlx wherever possible
//! - SQLite gets a single long-lived connection, so in-memory databases
//!   survive for as long as the wrapper is connected
//! - `disconnect` is idempotent in both flavours
//!
mod async_boilerplate;
mod boilerplate;
mod config;
mod decode;
mod engine;
mod error;
mod pool;
mod row;
mod stream;

// Re-export public types
pub use async_boilerplate::AsyncBoilerplate;
pub use boilerplate::{Boilerplate, ConnectionGuard, Rows};
pub use config::{ConnectionConfig, TableSchema};
pub use error::{Error, ErrorKind, Result};
pub use pool::DatabasePool;
pub use row::Row;
pub use stream::RowStream;

// Re-export the native pools accepted by `AsyncBoilerplate::from_pool`
pub use sqlx::{PgPool, SqlitePool};
