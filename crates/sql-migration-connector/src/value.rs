//! Runtime-typed row representation (spec.md §9 design note): each row is
//! an ordered list of `(column_name, Value)` pairs, not a `HashMap`, so
//! that source column order is preserved end to end — the insert
//! statement in C5 is built from this order, not a re-sorted one.

use sqlx::{mysql::MySqlRow, Column, Row, TypeInfo, ValueRef};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    UInteger(u64),
    Float(f64),
    Decimal(String),
    Bytes(Vec<u8>),
    Text(String),
    DateTime(chrono::NaiveDateTime),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::UInteger(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Text(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

pub type NamedRow = Vec<(String, Value)>;

/// Decode one `sqlx` row into an ordered `(name, Value)` list, matching
/// the column order the driver reports (which is the `SELECT` column
/// order, i.e. source order for an unqualified `SELECT *`).
pub fn decode_row(row: &MySqlRow) -> NamedRow {
    let mut out = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        let name = column.name().to_string();
        let value = decode_value(row, column.ordinal(), column.type_info());
        out.push((name, value));
    }

    out
}

fn decode_value(row: &MySqlRow, ordinal: usize, type_info: &sqlx::mysql::MySqlTypeInfo) -> Value {
    let raw = match row.try_get_raw(ordinal) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };

    if raw.is_null() {
        return Value::Null;
    }

    let name = type_info.name();

    match name {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            row.try_get::<i64, _>(ordinal).map(Value::Integer).unwrap_or(Value::Null)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED" => row
            .try_get::<u64, _>(ordinal)
            .map(Value::UInteger)
            .unwrap_or(Value::Null),
        "FLOAT" | "DOUBLE" => row.try_get::<f64, _>(ordinal).map(Value::Float).unwrap_or(Value::Null),
        "DECIMAL" | "NEWDECIMAL" => row
            .try_get::<bigdecimal::BigDecimal, _>(ordinal)
            .map(|d| Value::Decimal(d.to_string()))
            .unwrap_or(Value::Null),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(ordinal)
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        "DATE" => row.try_get::<chrono::NaiveDate, _>(ordinal).map(Value::Date).unwrap_or(Value::Null),
        "TIME" => row.try_get::<chrono::NaiveTime, _>(ordinal).map(Value::Time).unwrap_or(Value::Null),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Vec<u8>, _>(ordinal)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        _ => row.try_get::<String, _>(ordinal).map(Value::Text).unwrap_or(Value::Null),
    }
}
