//! `SeaORM` Entity for the `etl_runs` table.
//!
//! One row per pipeline run; the latest succeeded row carries the
//! incremental watermarks.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "etl_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub run_mode: String,
    pub status: String,
    pub started_at: DateTimeWithTimeZone,
    pub finished_at: Option<DateTimeWithTimeZone>,
    /// Highest OLTP document date loaded so far.
    pub watermark_doc_date: Option<Date>,
    /// Highest aggregate month loaded so far, as `YYYY-MM`.
    pub watermark_month: Option<String>,
    pub facts_loaded: i64,
    pub summary: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
