//! Input/output helpers.
//!
//! - precomputed summary JSON writer (`summary`)
//!
//! Reading inputs lives in `ingest::source`, next to the session that consumes them.

pub mod summary;

pub use summary::*;
