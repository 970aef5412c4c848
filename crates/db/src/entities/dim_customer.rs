//! `SeaORM` Entity for the `dim_customer` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_customer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_customer: i32,
    #[sea_orm(unique)]
    pub card_code: String,
    pub customer_name: String,
    pub zone: String,
    pub id_country: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dim_country::Entity",
        from = "Column::IdCountry",
        to = "super::dim_country::Column::IdCountry"
    )]
    DimCountry,
    #[sea_orm(has_many = "super::fact_sales::Entity")]
    FactSales,
}

impl Related<super::dim_country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DimCountry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
