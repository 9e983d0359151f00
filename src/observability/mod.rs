//! Observability for docpilot
//!
//! - Structured logging through `tracing`
//! - Monotonic pipeline counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. Counters are exact
//!
//! # Usage
//!
//! ```ignore
//! use docpilot::observability::{install_tracing_subscriber, MetricsRegistry};
//!
//! install_tracing_subscriber();
//! let metrics = MetricsRegistry::new();
//! metrics.increment_plans_generated();
//! ```

mod logging;
mod metrics;

pub use logging::{install_tracing_subscriber, DEFAULT_LOG_FILTER};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
