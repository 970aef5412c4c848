//! `SeaORM` Entity for the `dim_salesperson` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_salesperson")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_salesperson: i32,
    #[sea_orm(unique)]
    pub sp_code: String,
    pub sp_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
