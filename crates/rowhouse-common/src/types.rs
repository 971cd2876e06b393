//! Cell scalar and column type vocabulary.
//!
//! Parsers emit [`CellValue`]s, the schema detector emits [`ColumnType`]s,
//! and both cross the persistence boundary as plain JSON scalars.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Detected type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Date,
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Date => "date",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = crate::CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ColumnType::String),
            "integer" => Ok(ColumnType::Integer),
            "decimal" => Ok(ColumnType::Decimal),
            "boolean" => Ok(ColumnType::Boolean),
            "datetime" => Ok(ColumnType::DateTime),
            "date" => Ok(ColumnType::Date),
            "unknown" => Ok(ColumnType::Unknown),
            other => Err(crate::CommonError::parse(
                "column type",
                format!("unrecognized type '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single nullable scalar stored in a record's `data` mapping.
///
/// Serializes untagged, so a record round-trips through JSON as an ordinary
/// object of scalars. Decimals serialize as strings to preserve scale;
/// timestamps as RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Convert into the JSON scalar persisted in a record's `data` column.
    pub fn into_json(self) -> serde_json::Value {
        // Untagged enum serialization of scalars cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<CellValue> for serde_json::Value {
    fn from(value: CellValue) -> Self {
        value.into_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_column_type_round_trip() {
        for ty in [
            ColumnType::String,
            ColumnType::Integer,
            ColumnType::Decimal,
            ColumnType::Boolean,
            ColumnType::DateTime,
            ColumnType::Date,
            ColumnType::Unknown,
        ] {
            assert_eq!(ColumnType::from_str(ty.as_str()).unwrap(), ty);
        }
        assert!(ColumnType::from_str("currency").is_err());
    }

    #[test]
    fn test_column_type_wire_form() {
        let json = serde_json::to_string(&ColumnType::DateTime).unwrap();
        assert_eq!(json, "\"datetime\"");
    }

    #[test]
    fn test_cell_value_json_scalars() {
        assert_eq!(CellValue::Null.into_json(), serde_json::Value::Null);
        assert_eq!(CellValue::Int(42).into_json(), serde_json::json!(42));
        assert_eq!(CellValue::Bool(true).into_json(), serde_json::json!(true));
        assert_eq!(
            CellValue::Float(3.25).into_json(),
            serde_json::json!(3.25)
        );
        assert_eq!(
            CellValue::Text("hi".into()).into_json(),
            serde_json::json!("hi")
        );
    }

    #[test]
    fn test_decimal_serializes_as_string() {
        let value = CellValue::Decimal(Decimal::from_str("12.340").unwrap());
        assert_eq!(value.into_json(), serde_json::json!("12.340"));
    }
}
