//! dl-core: portfolio aggregation, the Oracle session and PDF export for DocketLens.
//!
//! Exposed as a library for integration testing.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod export;
pub mod session;
