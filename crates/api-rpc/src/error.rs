//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use tabula_core::domain::DomainError;
use tabula_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const QUEUE_FULL: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_)
        | AppError::Schema(_)
        | AppError::Serialization(_)
        | AppError::Stream(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::InvalidState(_) => code::CONFLICT,
        AppError::QueueFull(_) => code::QUEUE_FULL,
        AppError::Domain(e) => match e {
            DomainError::InvalidStatusTransition { .. } => code::CONFLICT,
            DomainError::Internal(_) => code::INTERNAL_ERROR,
        },
        AppError::Database(_) => code::DB_ERROR,
        AppError::Io(_) | AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };

    // NotFound keeps the bare message ("File <id> not found")
    let message = match err {
        AppError::NotFound(msg) | AppError::Validation(msg) => msg,
        other => other.to_string(),
    };

    ErrorObjectOwned::owned(code, message, None::<()>)
}

/// Validation failure raised by the RPC layer itself
pub fn invalid_params(msg: impl Into<String>) -> ErrorObjectOwned {
    to_rpc_error(AppError::Validation(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::domain::SchemaError;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            to_rpc_error(AppError::NotFound("File x not found".into())).code(),
            code::NOT_FOUND
        );
        assert_eq!(
            to_rpc_error(AppError::Schema(SchemaError::Empty)).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::Database("locked".into())).code(),
            code::DB_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::InvalidState("done".into())).code(),
            code::CONFLICT
        );
    }

    #[test]
    fn test_domain_error_codes() {
        let transition = DomainError::InvalidStatusTransition {
            from: "DONE".into(),
            to: "PROCESSING".into(),
        };
        assert_eq!(
            to_rpc_error(AppError::Domain(transition)).code(),
            code::CONFLICT
        );
        assert_eq!(
            to_rpc_error(AppError::Domain(DomainError::Internal("boom".into()))).code(),
            code::INTERNAL_ERROR
        );
    }

    #[test]
    fn test_queue_full_has_its_own_code() {
        let err = to_rpc_error(AppError::QueueFull("Ingestion queue is full".into()));
        assert_eq!(err.code(), code::QUEUE_FULL);
        assert_ne!(err.code(), code::INTERNAL_ERROR);
    }

    #[test]
    fn test_not_found_message_is_bare() {
        let err = to_rpc_error(AppError::NotFound("File abc not found".into()));
        assert_eq!(err.message(), "File abc not found");
    }
}
