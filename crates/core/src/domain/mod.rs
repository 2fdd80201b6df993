// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod page;
pub mod schema;
pub mod validator;
pub mod value;

// Re-exports
pub use error::{DomainError, SchemaError};
pub use job::{Job, JobId, JobStatus, ProcessingError};
pub use page::{PageRequest, PaginatedResult, StorePage};
pub use schema::{ColumnFormat, ColumnSchema, ColumnType};
pub use validator::{Record, RowValidationError, RowValidator};
pub use value::CellValue;
