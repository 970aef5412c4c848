//! Run log repository: run auditing and incremental watermarks.
//!
//! Every run opens a row in `etl_runs` and closes it with its status and
//! counts. The watermarks of the latest succeeded run bound what an
//! incremental run re-reads: OLTP documents strictly after the document
//! date, aggregate months strictly after the `YYYY-MM` month.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use starlift_shared::{EtlError, EtlResult};

use crate::db_err;
use crate::entities::etl_runs;

/// Terminal and in-flight run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Run row opened, work in progress.
    Running,
    /// Run finished; watermarks advanced.
    Succeeded,
    /// Run aborted on a fatal error; watermarks unchanged.
    Failed,
}

impl RunStatus {
    /// Stable database label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// High-water marks carried between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watermarks {
    /// Highest OLTP document date loaded so far.
    pub doc_date: Option<NaiveDate>,
    /// Highest aggregate month loaded so far, as `YYYY-MM`.
    pub month: Option<String>,
}

impl Watermarks {
    /// Combines two watermark sets, keeping the higher mark of each kind.
    ///
    /// A failed stage reports no new mark, so merging with the previous
    /// watermarks can only move forward, never back.
    #[must_use]
    pub fn merged(&self, newer: &Self) -> Self {
        Self {
            doc_date: self.doc_date.max(newer.doc_date),
            month: match (&self.month, &newer.month) {
                (Some(old), Some(new)) => Some(old.max(new).clone()),
                (old, new) => old.clone().or_else(|| new.clone()),
            },
        }
    }
}

/// Repository for the `etl_runs` log.
#[derive(Debug, Clone)]
pub struct RunLogRepository {
    db: DatabaseConnection,
}

impl RunLogRepository {
    /// Creates a new run log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens a run row and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn begin_run(&self, run_mode: &str) -> EtlResult<i64> {
        let row = etl_runs::ActiveModel {
            run_mode: Set(run_mode.to_string()),
            status: Set(RunStatus::Running.as_str().to_string()),
            started_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(row.id)
    }

    /// Watermarks of the latest succeeded run; empty for a first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn latest_watermarks(&self) -> EtlResult<Watermarks> {
        let row = etl_runs::Entity::find()
            .filter(etl_runs::Column::Status.eq(RunStatus::Succeeded.as_str()))
            .order_by_desc(etl_runs::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(row.map_or_else(Watermarks::default, |r| Watermarks {
            doc_date: r.watermark_doc_date,
            month: r.watermark_month,
        }))
    }

    /// Closes a run row with its final status, watermarks, and summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the run row is missing or the update fails.
    pub async fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        watermarks: &Watermarks,
        facts_loaded: i64,
        summary: &str,
    ) -> EtlResult<()> {
        let row = etl_runs::Entity::find_by_id(run_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| EtlError::Database(format!("etl_runs row {run_id} not found")))?;

        let mut active: etl_runs::ActiveModel = row.into();
        active.status = Set(status.as_str().to_string());
        active.finished_at = Set(Some(chrono::Utc::now().into()));
        active.watermark_doc_date = Set(watermarks.doc_date);
        active.watermark_month = Set(watermarks.month.clone());
        active.facts_loaded = Set(facts_loaded);
        active.summary = Set(Some(summary.to_string()));
        active.update(&self.db).await.map_err(db_err)?;

        Ok(())
    }
}
