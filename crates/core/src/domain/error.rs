// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while parsing a caller-declared column schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema must declare at least one column")]
    Empty,

    #[error("unknown column type '{type_tag}' for column '{column}' (expected string, number or boolean)")]
    UnknownType { column: String, type_tag: String },

    #[error("column '{0}' has an empty target name")]
    EmptyTargetName(String),

    #[error("target name '{0}' is declared by more than one column")]
    DuplicateTargetName(String),

    #[error("expected format must be a JSON object: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
