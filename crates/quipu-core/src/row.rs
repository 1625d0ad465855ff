use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Rendering kind of a column, used for CSV formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Bool,
    Int,
    Float,
    /// Fixed two-decimal rendering.
    Money,
    Text,
    Date,
    Timestamp,
}

/// A single cell value. `Null` is the explicit missing-data marker the
/// chaos rules inject.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render for CSV output. Nulls become empty fields.
    pub fn to_csv(&self, kind: ColumnKind) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => match kind {
                ColumnKind::Money => format!("{value:.2}"),
                _ => value.to_string(),
            },
            Value::Text(value) => value.clone(),
            Value::Date(value) => value.format("%Y-%m-%d").to_string(),
            Value::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

/// A row's cells, positionally aligned with its table's column specs.
pub type Row = Vec<Value>;
