//! Common utility functions
//!
//! This module provides reusable utilities including:
//! - **[`query`]**: Ordered query parameters and query-string helpers
//! - **[`serde`]**: `Duration` fields stored as whole milliseconds

pub mod query;
pub mod serde;

// Re-export commonly used items for convenience
pub use self::query::{parse_query_string, to_query_string, QueryParams};
pub use self::serde::duration_millis;
