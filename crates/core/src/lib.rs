pub mod config;
pub mod error;
pub mod metrics;

pub use config::Config;
pub use error::{Error, ErrorCode, ErrorContext, ErrorMetrics, RequestContext, Result};
pub use metrics::{DetectionMetrics, MetricsRegistry, MetricsService};

// Re-export commonly used types from dependencies
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;