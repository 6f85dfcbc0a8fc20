//! `supply-pulse` library crate.
//!
//! The binary (`pulse`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the precompute tool and the dashboard share one aggregation path
//! - code stays easy to navigate as the project grows

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod collab;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
