use futures::{FutureExt, StreamExt, TryStreamExt};
use serde_json::json;
use sqlx_boilerplate::{AsyncBoilerplate, ConnectionConfig, Error, ErrorKind, TableSchema};
use std::panic::AssertUnwindSafe;
use tempfile::TempDir;

fn tasks_config(url: &str) -> ConnectionConfig {
   ConnectionConfig::new(url)
      .with_create_tables(true)
      .with_table(TableSchema::new(
         "tasks",
         "CREATE TABLE IF NOT EXISTS tasks (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
      ))
}

async fn table_names(db: &AsyncBoilerplate) -> Vec<String> {
   db.fetch_all("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
      .await
      .unwrap()
      .into_iter()
      .map(|row| row[0].as_str().unwrap().to_string())
      .collect()
}

#[tokio::test]
async fn test_call_method() {
   let db = AsyncBoilerplate::new(tasks_config("sqlite://"))
      .unwrap()
      .await
      .unwrap();

   assert!(db.is_connected());

   let mut rows = db.execute("SELECT date('1982-10-26');").unwrap();
   let mut seen = 0;
   while let Some(row) = rows.try_next().await.unwrap() {
      assert_eq!(row.values(), &[json!("1982-10-26")]);
      seen += 1;
   }

   assert_eq!(seen, 1);
}

#[tokio::test]
async fn test_open_matches_connect() {
   let opened = AsyncBoilerplate::new(tasks_config("sqlite://"))
      .unwrap()
      .open()
      .await
      .unwrap();

   let mut connected = AsyncBoilerplate::new(tasks_config("sqlite://")).unwrap();
   connected.connect().await.unwrap();

   assert_eq!(opened.is_connected(), connected.is_connected());
   assert_eq!(table_names(&opened).await, table_names(&connected).await);
}

#[tokio::test]
async fn test_select_one_then_disconnect() {
   let mut db = AsyncBoilerplate::new(tasks_config("sqlite://")).unwrap();
   db.connect().await.unwrap();

   let rows: Vec<_> = db.execute("SELECT 1").unwrap().try_collect().await.unwrap();
   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0][0], json!(1));

   db.disconnect().await;

   let err = db.execute("SELECT 1").err().unwrap();
   assert!(matches!(err, Error::NotConnected));
   assert_eq!(err.kind(), ErrorKind::Execution);
}

#[tokio::test]
async fn test_connect_disconnect_is_repeatable() {
   let mut db = AsyncBoilerplate::new(tasks_config("sqlite://")).unwrap();

   for _ in 0..10 {
      db.connect().await.unwrap();
      assert_eq!(db.fetch_all("SELECT * FROM tasks").await.unwrap().len(), 0);
      db.disconnect().await;
      assert!(!db.is_connected());
   }

   db.disconnect().await;
   assert!(!db.is_connected());
}

#[tokio::test]
async fn test_create_tables_toggle() {
   let with_tables = AsyncBoilerplate::new(tasks_config("sqlite://"))
      .unwrap()
      .await
      .unwrap();
   assert_eq!(table_names(&with_tables).await, vec!["tasks"]);

   let without_tables = AsyncBoilerplate::new(tasks_config("sqlite://").with_create_tables(false))
      .unwrap()
      .await
      .unwrap();
   assert!(table_names(&without_tables).await.is_empty());
}

#[tokio::test]
async fn test_with_context() {
   let mut db = AsyncBoilerplate::new(tasks_config("sqlite://")).unwrap();

   let rows = db
      .scoped(|db| {
         Box::pin(async move {
            assert!(db.is_connected());
            let mut out = Vec::new();
            let mut rows = db.execute("SELECT date('1982-10-26');")?;
            while let Some(row) = rows.next().await {
               out.push(row?);
            }
            Ok::<_, Error>(out)
         })
      })
      .await
      .unwrap();

   assert_eq!(rows.len(), 1);
   assert_eq!(rows[0][0], json!("1982-10-26"));
   assert!(!db.is_connected());
}

#[tokio::test]
async fn test_scoped_disconnects_on_error() {
   let mut db = AsyncBoilerplate::new(tasks_config("sqlite://")).unwrap();

   let result: Result<(), Error> = db
      .scoped(|db| {
         Box::pin(async move {
            db.fetch_all("SELECT * FROM missing_table").await?;
            Ok(())
         })
      })
      .await;

   assert!(matches!(result, Err(Error::Execution(_))));
   assert!(!db.is_connected());
}

#[tokio::test]
async fn test_scoped_disconnects_on_panic() {
   let mut db = AsyncBoilerplate::new(tasks_config("sqlite://")).unwrap();

   let outcome = AssertUnwindSafe(db.scoped::<(), Error, _>(|db| {
      Box::pin(async move {
         let rows = db.fetch_all("SELECT * FROM tasks").await?;
         panic!("body failed after {} rows", rows.len())
      })
   }))
   .catch_unwind()
   .await;

   assert!(outcome.is_err());
   assert!(!db.is_connected());
}

#[tokio::test]
async fn test_scoped_disconnects_when_closure_panics() {
   let mut db = AsyncBoilerplate::new(tasks_config("sqlite://")).unwrap();

   let outcome = AssertUnwindSafe(db.scoped::<(), Error, _>(|_| panic!("body failed")))
      .catch_unwind()
      .await;

   assert!(outcome.is_err());
   assert!(!db.is_connected());
}

#[tokio::test]
async fn test_scoped_connect_failure_skips_body() {
   let config = ConnectionConfig::new("sqlite://")
      .with_create_tables(true)
      .with_table(TableSchema::new("broken", "CREATE TABLE broken ("));
   let mut db = AsyncBoilerplate::new(config).unwrap();

   let mut ran = false;
   let result: Result<(), Error> = db
      .scoped(|_| {
         ran = true;
         Box::pin(async { Ok(()) })
      })
      .await;

   assert!(matches!(result, Err(Error::CreateTables { .. })));
   assert!(!ran);
   assert!(!db.is_connected());
}

#[tokio::test]
async fn test_reconnect_on_file_database() {
   let temp_dir = TempDir::new().expect("Failed to create temp directory");
   let db_path = temp_dir.path().join("test.db");
   let url = format!("sqlite://{}?mode=rwc", db_path.display());

   let mut db = AsyncBoilerplate::new(tasks_config(&url)).unwrap().await.unwrap();
   db.fetch_all("INSERT INTO tasks (name) VALUES ('one'), ('two')")
      .await
      .unwrap();

   db.reconnect().await.unwrap();
   assert!(db.is_connected());

   let rows = db.fetch_all("SELECT name FROM tasks ORDER BY id").await.unwrap();
   let names: Vec<_> = rows.iter().map(|row| row["name"].clone()).collect();
   assert_eq!(names, vec![json!("one"), json!("two")]);

   db.disconnect().await;
}

#[tokio::test]
async fn test_fetch_one() {
   let db = AsyncBoilerplate::new(ConnectionConfig::new("sqlite://"))
      .unwrap()
      .await
      .unwrap();

   assert!(db.fetch_one("SELECT 1 WHERE 0").await.unwrap().is_none());
   assert_eq!(
      db.fetch_one("SELECT 'x' AS v").await.unwrap().unwrap()["v"],
      json!("x")
   );
   assert!(matches!(
      db.fetch_one("SELECT 1 UNION ALL SELECT 2").await,
      Err(Error::MultipleRowsReturned(2))
   ));
}

#[tokio::test]
async fn test_rows_serialize_as_json() {
   let db = AsyncBoilerplate::new(ConnectionConfig::new("sqlite://"))
      .unwrap()
      .await
      .unwrap();

   let row = db.fetch_one("SELECT 1 AS id, 'a' AS name").await.unwrap().unwrap();
   assert_eq!(
      serde_json::to_value(row.into_map()).unwrap(),
      json!({ "id": 1, "name": "a" })
   );
}

#[tokio::test]
async fn test_unreachable_database_is_connection_error() {
   let config = ConnectionConfig::new("postgresql://user:pw@127.0.0.1:1/app")
      .with_engine_option("acquire_timeout_secs", 1);

   let mut db = AsyncBoilerplate::new(config).unwrap();
   let err = db.connect().await.unwrap_err();

   assert_eq!(err.kind(), ErrorKind::Connection);
   assert!(!db.is_connected());
}

/// Runs against a live server when `POSTGRES_URL` is set.
#[tokio::test]
async fn test_postgres_types_decode() {
   let Ok(url) = std::env::var("POSTGRES_URL") else {
      return;
   };

   let mut db = AsyncBoilerplate::new(ConnectionConfig::new(url)).unwrap().await.unwrap();
   let row = db
      .fetch_one(
         "SELECT date '1982-10-26' AS d, current_database() AS n, 1.50::numeric AS x, \
          '{\"a\": 1}'::jsonb AS j, true AS b, 7::int8 AS i, 2.5::float8 AS f, \
          '\\x6869'::bytea AS bin, NULL::text AS nothing",
      )
      .await
      .unwrap()
      .unwrap();

   assert_eq!(row["d"], json!("1982-10-26"));
   assert!(row["n"].is_string());
   assert_eq!(row["x"], json!("1.50"));
   assert_eq!(row["j"], json!({ "a": 1 }));
   assert_eq!(row["b"], json!(true));
   assert_eq!(row["i"], json!(7));
   assert_eq!(row["f"], json!(2.5));
   assert_eq!(row["bin"], json!("aGk="));
   assert_eq!(row["nothing"], json!(null));

   db.disconnect().await;
}
