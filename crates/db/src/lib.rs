//! Warehouse layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the star schema
//! - Repository abstractions for dimension, fact, and run-log access
//! - Warehouse migrations
//! - The OLTP source reader and the pipeline orchestrator

pub mod entities;
pub mod migration;
pub mod pipeline;
pub mod repositories;
pub mod sources;

pub use pipeline::{Pipeline, RunMode, RunOptions};
pub use repositories::{
    DimensionRepository, FactRepository, ReconcileRepository, RunLogRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use starlift_shared::config::DatabaseConfig;
use starlift_shared::{EtlError, EtlResult};

/// Establishes a pooled connection to a database.
///
/// # Errors
///
/// Returns [`EtlError::Connectivity`] if the connection cannot be
/// established.
pub async fn connect(config: &DatabaseConfig) -> EtlResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    Database::connect(options).await.map_err(db_err)
}

/// Maps a `SeaORM` error onto the run taxonomy: connection failures are
/// retryable, everything else fails the run.
#[must_use]
pub fn db_err(err: DbErr) -> EtlError {
    match err {
        DbErr::Conn(e) => EtlError::Connectivity(e.to_string()),
        DbErr::ConnectionAcquire(e) => EtlError::Connectivity(e.to_string()),
        other => EtlError::Database(other.to_string()),
    }
}
