//! Core transform logic for Starlift.
//!
//! This crate contains the pure transform-and-merge logic of the pipeline
//! with ZERO database dependencies. Everything here is deterministic and
//! testable in memory; persistence lives in `starlift-db`.
//!
//! # Modules
//!
//! - `calendar` - Deterministic calendar derivation for the time dimension
//! - `dimensions` - Business keys, enrichment, and resolved key maps
//! - `normalize` - Raw source records to canonical fact tuples
//! - `reconcile` - Dual-currency amount reconciliation
//! - `report` - End-of-run summary accumulation
//! - `sources` - File-based source readers (FX workbook, monthly JSON feed)

pub mod calendar;
pub mod dimensions;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod sources;
