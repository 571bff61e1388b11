#![forbid(unsafe_code)]

//! Command-line support: loading graphs from CSV and parsing query arguments.

/// CSV edge import into an in-memory graph.
pub mod import;
