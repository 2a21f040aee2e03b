//! Structured error handling for the abuse-detection engine.
//!
//! - [`ErrorCode`]: stable, numeric-ranged technical error codes
//! - [`ErrorContext`] / [`RequestContext`]: correlation data carried alongside an error
//! - [`Error`]: the crate-wide error type, with environment-aware API sanitization
//! - [`ErrorMetrics`]: in-process error-rate tracking for health checks and logging
//!
//! ```rust
//! use erp_core::error::{Error, ErrorCode, Result};
//!
//! fn validate_email(email: &str) -> Result<()> {
//!     if !email.contains('@') {
//!         return Err(Error::validation("invalid email format"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod codes;
pub mod context;
pub mod framework;
pub mod metrics;

pub use codes::ErrorCode;
pub use context::{ErrorContext, RequestContext};
pub use framework::{Error, ErrorCategory, ErrorSeverity, Result};
pub use metrics::ErrorMetrics;