//! `SeaORM` Entity for the `dim_currency` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_currency")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_currency: i32,
    #[sea_orm(unique)]
    pub currency_code: String,
    pub currency_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
