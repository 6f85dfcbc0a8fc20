//! The aggregation core shared by the runtime ingest and the precompute tool.
//!
//! - row normalization (`normalize`)
//! - per-period accumulation + sorted snapshots (`store`)
//! - range selection over a snapshot (`range`)

pub mod normalize;
pub mod range;
pub mod store;

pub use normalize::normalize;
pub use range::{select, select_now};
pub use store::AggregateStore;
