//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical column names of the incident table
//! - raw (untyped) tabular input (`RawTable`, `RawCell`)
//! - normalized incident rows (`IncidentRecord`)

pub mod types;

pub use types::*;
