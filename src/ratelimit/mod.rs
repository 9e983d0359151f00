//! Rate limiting for docpilot
//!
//! A `RateLimiter` is built explicitly and shared by reference; there is
//! no process-wide bucket table. Time comes from an injectable `Clock`.

mod clock;
mod limiter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{RateBucket, RateDecision, RateLimitConfig, RateLimiter};
