//! `SeaORM` Entity for the `fact_sales` table.
//!
//! The idempotency key is `(source_system, source_doc_id, line_no)`; the
//! surrogate `id_fact` exists only for row identity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "fact_sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_fact: i64,
    pub id_date: i32,
    pub id_customer: i32,
    pub id_product: i32,
    pub id_salesperson: i32,
    pub id_warehouse: i32,
    pub id_country: i32,
    pub id_currency: i32,
    pub quantity: Decimal,
    pub total_usd: Option<Decimal>,
    pub total_local: Option<Decimal>,
    pub source_system: String,
    pub source_doc_id: String,
    pub line_no: i32,
    pub load_ts: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::dim_time::Entity",
        from = "Column::IdDate",
        to = "super::dim_time::Column::IdDate"
    )]
    DimTime,
    #[sea_orm(
        belongs_to = "super::dim_customer::Entity",
        from = "Column::IdCustomer",
        to = "super::dim_customer::Column::IdCustomer"
    )]
    DimCustomer,
    #[sea_orm(
        belongs_to = "super::dim_product::Entity",
        from = "Column::IdProduct",
        to = "super::dim_product::Column::IdProduct"
    )]
    DimProduct,
}

impl Related<super::dim_time::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DimTime.def()
    }
}

impl Related<super::dim_customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DimCustomer.def()
    }
}

impl Related<super::dim_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DimProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
