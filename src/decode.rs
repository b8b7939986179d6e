use serde_json::Value as JsonValue;
use sqlx::postgres::{PgValueFormat, PgValueRef};
use sqlx::sqlite::SqliteValueRef;
use sqlx::{TypeInfo, Value, ValueRef};

use crate::Error;

/// Convert a SQLite value to a JSON value.
///
/// SQLite reports a storage class per value. Dates and times are stored as
/// text and are returned unchanged.
///
/// Note: BLOB values are returned as base64-encoded strings since JSON
/// has no native binary type.
pub fn sqlite_to_json(value: SqliteValueRef<'_>) -> Result<JsonValue, Error> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_info = value.type_info().into_owned();
   let owned = ValueRef::to_owned(&value);

   let result = match type_info.name() {
      "TEXT" | "DATE" | "TIME" | "DATETIME" => owned
         .try_decode_unchecked::<String>()
         .map(JsonValue::String)
         .unwrap_or(JsonValue::Null),

      "INTEGER" | "NUMERIC" => owned
         .try_decode::<i64>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "BOOLEAN" => owned
         .try_decode::<bool>()
         .map(JsonValue::Bool)
         .unwrap_or(JsonValue::Null),

      // Non-finite floats have no JSON representation and become null
      "REAL" => owned
         .try_decode::<f64>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "BLOB" => owned
         .try_decode::<Vec<u8>>()
         .map(|blob| JsonValue::String(base64_encode(&blob)))
         .unwrap_or(JsonValue::Null),

      "NULL" => JsonValue::Null,

      other => match owned.try_decode_unchecked::<String>() {
         Ok(text) => JsonValue::String(text),
         Err(_) => {
            return Err(Error::UnsupportedDatatype(format!(
               "Unknown SQLite type: {}",
               other
            )));
         }
      },
   };

   Ok(result)
}

/// Convert a PostgreSQL value to a JSON value.
///
/// Booleans, integers, floats, `bytea` and `json`/`jsonb` get their JSON
/// counterparts. Every other type (dates, timestamps, `numeric`, `uuid`,
/// `name`, enums, ...) is returned as its PostgreSQL text representation,
/// which keeps `numeric` values exact.
pub fn postgres_to_json(value: PgValueRef<'_>) -> Result<JsonValue, Error> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_info = value.type_info().into_owned();
   let format = value.format();
   let owned = ValueRef::to_owned(&value);

   let result = match type_info.name() {
      "BOOL" => owned
         .try_decode::<bool>()
         .map(JsonValue::Bool)
         .unwrap_or(JsonValue::Null),

      "INT2" => owned
         .try_decode::<i16>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "INT4" => owned
         .try_decode::<i32>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "INT8" => owned
         .try_decode::<i64>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "FLOAT4" => owned
         .try_decode::<f32>()
         .map(|v| JsonValue::from(f64::from(v)))
         .unwrap_or(JsonValue::Null),

      "FLOAT8" => owned
         .try_decode::<f64>()
         .map(JsonValue::from)
         .unwrap_or(JsonValue::Null),

      "BYTEA" => owned
         .try_decode::<Vec<u8>>()
         .map(|blob| JsonValue::String(base64_encode(&blob)))
         .unwrap_or(JsonValue::Null),

      "JSON" | "JSONB" if format == PgValueFormat::Text => owned
         .try_decode_unchecked::<String>()
         .ok()
         .and_then(|text| serde_json::from_str(&text).ok())
         .unwrap_or(JsonValue::Null),

      other => match format {
         PgValueFormat::Text => owned
            .try_decode_unchecked::<String>()
            .map(JsonValue::String)
            .map_err(|_| Error::UnsupportedDatatype(format!("Undecodable PostgreSQL {}", other)))?,
         PgValueFormat::Binary => {
            return Err(Error::UnsupportedDatatype(format!(
               "Unknown PostgreSQL type: {}",
               other
            )));
         }
      },
   };

   Ok(result)
}

/// Base64 encode binary data for JSON serialization.
fn base64_encode(data: &[u8]) -> String {
   use base64::Engine;
   base64::engine::general_purpose::STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_base64_encode() {
      assert_eq!(base64_encode(b"hello"), "aGVsbG8=");
      assert_eq!(base64_encode(&[1, 2, 3, 4, 5]), "AQIDBAU=");
      assert_eq!(base64_encode(&[]), "");
   }

   #[test]
   fn test_base64_encode_binary() {
      assert_eq!(base64_encode(&[0, 0, 0]), "AAAA");
      assert_eq!(base64_encode(&[255, 255, 255]), "////");
   }
}
