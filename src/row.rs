//! Driver-independent result rows

use std::ops::Index;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _};

use crate::Error;
use crate::decode::{postgres_to_json, sqlite_to_json};

/// One row produced by `execute`.
///
/// Values keep the column order of the statement. Duplicate column names are
/// allowed (`SELECT 1, 1`); lookups by name return the first match.
///
/// ```
/// use serde_json::json;
/// use sqlx_boilerplate::Row;
///
/// let row = Row::new(vec!["id".into(), "name".into()], vec![json!(1), json!("Alice")]);
/// assert_eq!(row[0], json!(1));
/// assert_eq!(row["name"], json!("Alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
   columns: Vec<String>,
   values: Vec<JsonValue>,
}

impl Row {
   /// Build a row from parallel column and value lists.
   ///
   /// Missing values are filled with null; surplus values are dropped.
   pub fn new(columns: Vec<String>, mut values: Vec<JsonValue>) -> Self {
      values.resize(columns.len(), JsonValue::Null);
      Self { columns, values }
   }

   pub fn columns(&self) -> &[String] {
      &self.columns
   }

   pub fn values(&self) -> &[JsonValue] {
      &self.values
   }

   pub fn len(&self) -> usize {
      self.values.len()
   }

   pub fn is_empty(&self) -> bool {
      self.values.is_empty()
   }

   /// Value at column position `index`.
   pub fn get(&self, index: usize) -> Option<&JsonValue> {
      self.values.get(index)
   }

   /// Value of the first column called `name`.
   pub fn get_by_name(&self, name: &str) -> Option<&JsonValue> {
      self
         .columns
         .iter()
         .position(|column| column == name)
         .map(|index| &self.values[index])
   }

   pub fn into_values(self) -> Vec<JsonValue> {
      self.values
   }

   /// Convert into an ordered map keyed by column name.
   ///
   /// With duplicate column names the last value wins, at the position of the
   /// first occurrence.
   pub fn into_map(self) -> IndexMap<String, JsonValue> {
      self.columns.into_iter().zip(self.values).collect()
   }
}

impl Index<usize> for Row {
   type Output = JsonValue;

   fn index(&self, index: usize) -> &Self::Output {
      &self.values[index]
   }
}

impl Index<&str> for Row {
   type Output = JsonValue;

   fn index(&self, name: &str) -> &Self::Output {
      self
         .get_by_name(name)
         .unwrap_or_else(|| panic!("no column named '{}'", name))
   }
}

impl TryFrom<&SqliteRow> for Row {
   type Error = Error;

   fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
      let mut values = Vec::with_capacity(row.len());
      for index in 0..row.len() {
         let raw = row.try_get_raw(index).map_err(Error::Execution)?;
         values.push(sqlite_to_json(raw)?);
      }

      Ok(Self {
         columns: column_names(row),
         values,
      })
   }
}

impl TryFrom<&PgRow> for Row {
   type Error = Error;

   fn try_from(row: &PgRow) -> Result<Self, Self::Error> {
      let mut values = Vec::with_capacity(row.len());
      for index in 0..row.len() {
         let raw = row.try_get_raw(index).map_err(Error::Execution)?;
         values.push(postgres_to_json(raw)?);
      }

      Ok(Self {
         columns: column_names(row),
         values,
      })
   }
}

fn column_names<R: sqlx::Row>(row: &R) -> Vec<String> {
   row
      .columns()
      .iter()
      .map(|column| column.name().to_string())
      .collect()
}
