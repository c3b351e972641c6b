//! # Slate Core
//!
//! Core types shared by every Slate crate.
//!
//! - [`errors`]: the application error taxonomy with HTTP response conversion
//! - [`retry`]: bounded exponential-backoff retry policy
//!
//! # Example
//!
//! ```ignore
//! use slate_core::errors::{AppError, reasons};
//!
//! let error = AppError::validation(reasons::COURSE_AT_CAPACITY, "Course is at full capacity");
//! assert_eq!(error.code.as_str(), "VALIDATION_ERROR");
//! ```

pub mod errors;
pub mod retry;

// Re-export commonly used types at crate root
pub use errors::{AppError, ErrorBody, ErrorCode, ErrorResponse, reasons};
pub use retry::RetryPolicy;
