// Cell values - a CSV field classified once into a native scalar

use super::schema::ColumnType;
use serde_json::{Number, Value};

/// A single parsed CSV field.
///
/// Classification rules:
/// - integer literals and finite float literals become `Number`
/// - `true` / `false` (exact, lowercase) become `Boolean`
/// - everything else, including the empty field, stays `String`
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Number(Number),
    Boolean(bool),
}

impl CellValue {
    pub fn from_field(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<i64>() {
            return CellValue::Number(Number::from(n));
        }
        if let Some(n) = parse_finite_float(raw) {
            return CellValue::Number(n);
        }
        match raw {
            "true" => CellValue::Boolean(true),
            "false" => CellValue::Boolean(false),
            _ => CellValue::String(raw.to_string()),
        }
    }

    /// Variant tag, compared against a column's expected type
    pub fn column_type(&self) -> ColumnType {
        match self {
            CellValue::String(_) => ColumnType::String,
            CellValue::Number(_) => ColumnType::Number,
            CellValue::Boolean(_) => ColumnType::Boolean,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            CellValue::String(s) => Value::String(s),
            CellValue::Number(n) => Value::Number(n),
            CellValue::Boolean(b) => Value::Bool(b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(raw: &str) -> Self {
        CellValue::String(raw.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(Number::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// "inf", "NaN" and friends parse as f64 but are not numeric literals
fn parse_finite_float(raw: &str) -> Option<Number> {
    if !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}
