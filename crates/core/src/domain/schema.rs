// Column Schema - caller-declared expected format of a CSV file

use super::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Scalar type a column is expected to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
}

impl ColumnType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(ColumnType::String),
            "number" => Some(ColumnType::Number),
            "boolean" => Some(ColumnType::Boolean),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Number => write!(f, "number"),
            ColumnType::Boolean => write!(f, "boolean"),
        }
    }
}

/// One declared column: `source_key -> (target_name, expected_type)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFormat {
    pub source_key: String,
    pub target_name: String,
    pub expected_type: ColumnType,
}

/// Wire shape of a single entry in the expected format (`{"name": .., "type": ..}`)
#[derive(Debug, Deserialize)]
struct RawColumnFormat {
    name: String,
    #[serde(rename = "type")]
    type_tag: String,
}

/// Ordered column schema.
///
/// Entries are kept sorted by `source_key`, which fixes the positional order used to zip
/// raw row values regardless of the order the caller declared them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnFormat>", into = "Vec<ColumnFormat>")]
pub struct ColumnSchema {
    columns: Vec<ColumnFormat>,
}

impl ColumnSchema {
    /// Build a schema from entries in any order
    pub fn new(columns: impl IntoIterator<Item = ColumnFormat>) -> Result<Self, SchemaError> {
        let mut columns: Vec<ColumnFormat> = columns.into_iter().collect();
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        columns.sort_by(|a, b| a.source_key.cmp(&b.source_key));

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.target_name.is_empty() {
                return Err(SchemaError::EmptyTargetName(column.source_key.clone()));
            }
            if !seen.insert(column.target_name.as_str()) {
                return Err(SchemaError::DuplicateTargetName(column.target_name.clone()));
            }
        }

        Ok(Self { columns })
    }

    /// Parse the caller-facing expected format: `{"A": {"name": "name", "type": "string"}}`
    ///
    /// Unknown type tags are rejected here instead of failing every row later.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SchemaError> {
        let raw: BTreeMap<String, RawColumnFormat> = serde_json::from_value(value.clone())
            .map_err(|e| SchemaError::Malformed(e.to_string()))?;

        let columns = raw
            .into_iter()
            .map(|(source_key, format)| {
                let expected_type = ColumnType::parse(&format.type_tag).ok_or_else(|| {
                    SchemaError::UnknownType {
                        column: source_key.clone(),
                        type_tag: format.type_tag.clone(),
                    }
                })?;
                Ok(ColumnFormat {
                    source_key,
                    target_name: format.name,
                    expected_type,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Self::new(columns)
    }

    /// Same as [`ColumnSchema::from_json`], for a format passed as a JSON string
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value =
            serde_json::from_str(s).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Columns in positional order
    pub fn columns(&self) -> &[ColumnFormat] {
        &self.columns
    }

    /// Expected row width
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Serialize back to the caller-facing map shape
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .map(|c| {
                (
                    c.source_key.clone(),
                    serde_json::json!({ "name": c.target_name, "type": c.expected_type }),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl TryFrom<Vec<ColumnFormat>> for ColumnSchema {
    type Error = SchemaError;

    fn try_from(columns: Vec<ColumnFormat>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<ColumnSchema> for Vec<ColumnFormat> {
    fn from(schema: ColumnSchema) -> Self {
        schema.columns
    }
}
