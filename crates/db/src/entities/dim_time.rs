//! `SeaORM` Entity for the `dim_time` table.
//!
//! The primary key is the deterministic `YYYYMMDD` encoding of the date,
//! never sequence-assigned.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_time")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_date: i32,
    pub date: Date,
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub quarter: i32,
    pub month_name: String,
    /// USD to local-currency rate valid on this date, once known.
    pub fx_usd_local: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::fact_sales::Entity")]
    FactSales,
}

impl Related<super::fact_sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FactSales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
