//! Database-backed source readers.

pub mod oltp;

pub use oltp::OltpSource;
