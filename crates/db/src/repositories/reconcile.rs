//! Reconciliation sweep: derive missing amount legs from stored FX rates.
//!
//! Facts with exactly one populated leg are re-read each run and completed
//! once a rate for their date is known. Source-provided values always win,
//! so the sweep is idempotent; facts whose date still has no rate are
//! counted and left for a later run.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use starlift_core::reconcile::{Amounts, ReconcileOutcome, reconcile};
use starlift_shared::EtlResult;
use tracing::info;

use crate::db_err;
use crate::entities::{dim_time, fact_sales};

/// Counts from one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCounts {
    /// Facts whose local leg was derived from USD.
    pub filled_local: u64,
    /// Facts whose USD leg was derived from local.
    pub filled_usd: u64,
    /// Facts still missing a leg because their date has no rate.
    pub awaiting_rate: u64,
}

/// Repository for the currency reconciliation sweep.
#[derive(Debug, Clone)]
pub struct ReconcileRepository {
    db: DatabaseConnection,
}

impl ReconcileRepository {
    /// Creates a new reconcile repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Sweeps every half-populated fact, deriving the missing leg where a
    /// rate is stored for the fact's date.
    ///
    /// # Errors
    ///
    /// Returns an error if the reads or the update transaction fail.
    pub async fn sweep(&self) -> EtlResult<SweepCounts> {
        let rates = self.load_rates().await?;

        // Exactly one leg populated.
        let candidates = fact_sales::Entity::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(fact_sales::Column::TotalLocal.is_null())
                            .add(fact_sales::Column::TotalUsd.is_not_null()),
                    )
                    .add(
                        Condition::all()
                            .add(fact_sales::Column::TotalUsd.is_null())
                            .add(fact_sales::Column::TotalLocal.is_not_null()),
                    ),
            )
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut counts = SweepCounts::default();
        let txn = self.db.begin().await.map_err(db_err)?;

        for model in candidates {
            let rate = rates.get(&model.id_date).copied();
            let amounts = Amounts {
                usd: model.total_usd,
                local: model.total_local,
            };

            match reconcile(amounts, rate) {
                ReconcileOutcome::FilledLocal(local) => {
                    let mut active: fact_sales::ActiveModel = model.into();
                    active.total_local = Set(Some(local));
                    active.update(&txn).await.map_err(db_err)?;
                    counts.filled_local += 1;
                }
                ReconcileOutcome::FilledUsd(usd) => {
                    let mut active: fact_sales::ActiveModel = model.into();
                    active.total_usd = Set(Some(usd));
                    active.update(&txn).await.map_err(db_err)?;
                    counts.filled_usd += 1;
                }
                ReconcileOutcome::Unchanged => {
                    counts.awaiting_rate += 1;
                }
            }
        }

        txn.commit().await.map_err(db_err)?;
        info!(
            filled_local = counts.filled_local,
            filled_usd = counts.filled_usd,
            awaiting_rate = counts.awaiting_rate,
            "reconciliation sweep finished"
        );
        Ok(counts)
    }

    async fn load_rates(&self) -> EtlResult<HashMap<i32, Decimal>> {
        let rows = dim_time::Entity::find()
            .filter(dim_time::Column::FxUsdLocal.is_not_null())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.fx_usd_local.map(|rate| (row.id_date, rate)))
            .collect())
    }
}
