//! `SeaORM` Entity for the `dim_country` table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "dim_country")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_country: i32,
    #[sea_orm(unique)]
    pub country_code: String,
    pub country_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::dim_customer::Entity")]
    DimCustomer,
}

impl Related<super::dim_customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DimCustomer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
