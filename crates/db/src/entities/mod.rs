//! `SeaORM` entity definitions for the star schema.

pub mod dim_country;
pub mod dim_currency;
pub mod dim_customer;
pub mod dim_product;
pub mod dim_salesperson;
pub mod dim_time;
pub mod dim_warehouse;
pub mod etl_runs;
pub mod fact_sales;
