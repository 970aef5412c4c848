//! `SeaORM` Entity for the `dim_product` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_product: i32,
    #[sea_orm(unique)]
    pub item_code: String,
    pub product_name: String,
    pub brand: String,
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
