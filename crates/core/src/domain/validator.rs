// Row Validator - maps a raw row onto the declared schema

use super::schema::{ColumnSchema, ColumnType};
use super::value::CellValue;
use thiserror::Error;

/// A validated row: `target_name -> value`
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Per-row validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowValidationError {
    #[error("Row length does not match expected format (expected {expected} columns, found {actual})")]
    RowWidthMismatch { expected: usize, actual: usize },

    #[error("Row value does not match expected type (column '{column}' expected {expected}, found {actual})")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: ColumnType,
    },
}

impl RowValidationError {
    /// Offending source column key, empty for width mismatches
    pub fn column(&self) -> &str {
        match self {
            RowValidationError::RowWidthMismatch { .. } => "",
            RowValidationError::TypeMismatch { column, .. } => column,
        }
    }
}

/// Validates rows against one schema.
///
/// Holds the schema whose columns are already in positional order, so the order is
/// fixed once per job and reused for every row.
pub struct RowValidator<'a> {
    schema: &'a ColumnSchema,
}

impl<'a> RowValidator<'a> {
    pub fn new(schema: &'a ColumnSchema) -> Self {
        Self { schema }
    }

    /// Validate one row. No coercion: a value must already carry the expected type.
    pub fn validate(&self, row: Vec<CellValue>) -> Result<Record, RowValidationError> {
        let columns = self.schema.columns();
        if row.len() != columns.len() {
            return Err(RowValidationError::RowWidthMismatch {
                expected: columns.len(),
                actual: row.len(),
            });
        }

        // Check every position before building the record
        for (value, column) in row.iter().zip(columns) {
            let actual = value.column_type();
            if actual != column.expected_type {
                return Err(RowValidationError::TypeMismatch {
                    column: column.source_key.clone(),
                    expected: column.expected_type,
                    actual,
                });
            }
        }

        Ok(row
            .into_iter()
            .zip(columns)
            .map(|(value, column)| (column.target_name.clone(), value.into_json()))
            .collect())
    }
}
