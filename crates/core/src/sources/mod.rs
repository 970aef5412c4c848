//! File-based source readers.
//!
//! - `fx` - FX rate workbook (spreadsheet)
//! - `aggregate` - monthly aggregated JSON sales feed

pub mod aggregate;
pub mod fx;
