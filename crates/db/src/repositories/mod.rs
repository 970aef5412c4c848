//! Repository abstractions for warehouse access.
//!
//! Repositories provide a clean interface for warehouse operations,
//! hiding the `SeaORM` implementation details from the pipeline.

pub mod dimension;
pub mod fact;
pub mod reconcile;
pub mod run_log;

pub use dimension::DimensionRepository;
pub use fact::{FactRepository, prepare_batch, validate_batch};
pub use reconcile::{ReconcileRepository, SweepCounts};
pub use run_log::{RunLogRepository, RunStatus, Watermarks};
