//! sqlx error classification.
//!
//! | sqlx error | [`ErrorCode`] |
//! |------------|--------------|
//! | SQLSTATE `23505` (unique violation) | `DUPLICATE` |
//! | SQLSTATE `40001`, `40P01`, `55P03` | `TRANSIENT_STORE_ERROR` |
//! | pool timeout, pool closed, I/O | `TRANSIENT_STORE_ERROR` |
//! | `RowNotFound` | `NOT_FOUND` |
//! | anything else | `INTERNAL_ERROR` |
//!
//! [`ErrorCode`]: slate_core::ErrorCode

use slate_core::{AppError, ErrorCode};

pub const UNIQUE_VIOLATION: &str = "23505";
pub const SERIALIZATION_FAILURE: &str = "40001";
pub const DEADLOCK_DETECTED: &str = "40P01";
pub const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Maps a SQLSTATE code onto the error taxonomy, if it has a dedicated entry.
pub fn code_for_sqlstate(sqlstate: &str) -> Option<ErrorCode> {
    match sqlstate {
        UNIQUE_VIOLATION => Some(ErrorCode::Duplicate),
        SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE => {
            Some(ErrorCode::TransientStoreError)
        }
        _ => None,
    }
}

pub fn classify(err: sqlx::Error) -> AppError {
    let code = match &err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|sqlstate| code_for_sqlstate(&sqlstate))
            .unwrap_or(ErrorCode::InternalError),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ErrorCode::TransientStoreError
        }
        sqlx::Error::RowNotFound => ErrorCode::NotFound,
        _ => ErrorCode::InternalError,
    };
    AppError::new(code, err)
}

/// Like [`classify`], but a unique violation carries `message` so callers see
/// which record already exists.
pub fn classify_duplicate(err: sqlx::Error, message: &str) -> AppError {
    let classified = classify(err);
    if classified.code == ErrorCode::Duplicate {
        AppError::duplicate(message)
    } else {
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlstate_mapping() {
        assert_eq!(code_for_sqlstate("23505"), Some(ErrorCode::Duplicate));
        assert_eq!(code_for_sqlstate("40001"), Some(ErrorCode::TransientStoreError));
        assert_eq!(code_for_sqlstate("40P01"), Some(ErrorCode::TransientStoreError));
        assert_eq!(code_for_sqlstate("55P03"), Some(ErrorCode::TransientStoreError));
        // check_violation is a bug in our code, not a retryable condition
        assert_eq!(code_for_sqlstate("23514"), None);
    }

    #[test]
    fn test_pool_errors_are_transient() {
        assert!(classify(sqlx::Error::PoolTimedOut).is_transient());
        assert!(classify(sqlx::Error::PoolClosed).is_transient());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(classify(sqlx::Error::Io(io)).is_transient());
    }

    #[test]
    fn test_row_not_found() {
        assert_eq!(classify(sqlx::Error::RowNotFound).code, ErrorCode::NotFound);
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = classify(sqlx::Error::Protocol("unexpected message".into()));
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(!err.is_transient());
    }
}
