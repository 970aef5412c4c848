//! `SeaORM` Entity for the `dim_warehouse` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_warehouse")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_warehouse: i32,
    #[sea_orm(unique)]
    pub whs_code: String,
    pub whs_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
