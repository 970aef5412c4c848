//! Dimension repository: get-or-create resolution and the FX backfill.
//!
//! Every get-or-create is a conditional insert (`ON CONFLICT DO NOTHING`)
//! followed by a read, so two concurrent resolutions of the same business
//! key converge on one row without advisory locking. The returned flag
//! reports whether this call created the row.

use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use starlift_core::calendar::CalendarDay;
use starlift_core::dimensions::{NewCoded, NewCustomer, NewProduct, ResolvedDimensions, UNKNOWN_CODE};
use starlift_shared::types::{
    CountryKey, CurrencyKey, CustomerKey, DateKey, ProductKey, SalespersonKey, WarehouseKey,
};
use starlift_shared::{EtlError, EtlResult};

use crate::db_err;
use crate::entities::{
    dim_country, dim_currency, dim_customer, dim_product, dim_salesperson, dim_time,
    dim_warehouse,
};

/// Dimension repository for get-or-create resolution.
#[derive(Debug, Clone)]
pub struct DimensionRepository {
    db: DatabaseConnection,
}

impl DimensionRepository {
    /// Creates a new dimension repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ensures a time-dimension row exists for a calendar day.
    ///
    /// The key is derived from the date, so this can only ever insert or
    /// no-op; it never updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn ensure_time_day(&self, day: &CalendarDay) -> EtlResult<DateKey> {
        #[allow(clippy::cast_possible_wrap)]
        let model = dim_time::ActiveModel {
            id_date: Set(day.key.into_inner()),
            date: Set(day.date),
            year: Set(day.year),
            month: Set(day.month as i32),
            day: Set(day.day as i32),
            quarter: Set(day.quarter as i32),
            month_name: Set(day.month_name.to_string()),
            ..Default::default()
        };

        dim_time::Entity::insert(model)
            .on_conflict(
                OnConflict::column(dim_time::Column::IdDate)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(db_err)?;

        Ok(day.key)
    }

    /// Records the USD→local rate on a date's time row, creating the row
    /// first if needed. A reloaded workbook overwrites the stored rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn apply_fx_rate(&self, day: &CalendarDay, rate: Decimal) -> EtlResult<()> {
        self.ensure_time_day(day).await?;

        dim_time::Entity::update_many()
            .col_expr(dim_time::Column::FxUsdLocal, Expr::value(rate))
            .filter(dim_time::Column::IdDate.eq(day.key.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Resolves a customer row, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or read fails.
    pub async fn get_or_create_customer(
        &self,
        payload: &NewCustomer,
        country: CountryKey,
    ) -> EtlResult<(CustomerKey, bool)> {
        let inserted = dim_customer::Entity::insert(dim_customer::ActiveModel {
            card_code: Set(payload.card_code.clone()),
            customer_name: Set(payload.name.clone()),
            zone: Set(payload.zone.clone()),
            id_country: Set(country.into_inner()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(dim_customer::Column::CardCode)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(db_err)?;

        let row = dim_customer::Entity::find()
            .filter(dim_customer::Column::CardCode.eq(&payload.card_code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing_row("dim_customer", &payload.card_code))?;

        Ok((CustomerKey(row.id_customer), inserted > 0))
    }

    /// Resolves a product row, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or read fails.
    pub async fn get_or_create_product(
        &self,
        payload: &NewProduct,
    ) -> EtlResult<(ProductKey, bool)> {
        let inserted = dim_product::Entity::insert(dim_product::ActiveModel {
            item_code: Set(payload.item_code.clone()),
            product_name: Set(payload.name.clone()),
            brand: Set(payload.brand.clone()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(dim_product::Column::ItemCode)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(db_err)?;

        let row = dim_product::Entity::find()
            .filter(dim_product::Column::ItemCode.eq(&payload.item_code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing_row("dim_product", &payload.item_code))?;

        Ok((ProductKey(row.id_product), inserted > 0))
    }

    /// Resolves a salesperson row, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or read fails.
    pub async fn get_or_create_salesperson(
        &self,
        payload: &NewCoded,
    ) -> EtlResult<(SalespersonKey, bool)> {
        let inserted = dim_salesperson::Entity::insert(dim_salesperson::ActiveModel {
            sp_code: Set(payload.code.clone()),
            sp_name: Set(payload.name.clone()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(dim_salesperson::Column::SpCode)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(db_err)?;

        let row = dim_salesperson::Entity::find()
            .filter(dim_salesperson::Column::SpCode.eq(&payload.code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing_row("dim_salesperson", &payload.code))?;

        Ok((SalespersonKey(row.id_salesperson), inserted > 0))
    }

    /// Resolves a warehouse row, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or read fails.
    pub async fn get_or_create_warehouse(
        &self,
        payload: &NewCoded,
    ) -> EtlResult<(WarehouseKey, bool)> {
        let inserted = dim_warehouse::Entity::insert(dim_warehouse::ActiveModel {
            whs_code: Set(payload.code.clone()),
            whs_name: Set(payload.name.clone()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(dim_warehouse::Column::WhsCode)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(db_err)?;

        let row = dim_warehouse::Entity::find()
            .filter(dim_warehouse::Column::WhsCode.eq(&payload.code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing_row("dim_warehouse", &payload.code))?;

        Ok((WarehouseKey(row.id_warehouse), inserted > 0))
    }

    /// Resolves a country row, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or read fails.
    pub async fn get_or_create_country(
        &self,
        payload: &NewCoded,
    ) -> EtlResult<(CountryKey, bool)> {
        let inserted = dim_country::Entity::insert(dim_country::ActiveModel {
            country_code: Set(payload.code.clone()),
            country_name: Set(payload.name.clone()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(dim_country::Column::CountryCode)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(db_err)?;

        let row = dim_country::Entity::find()
            .filter(dim_country::Column::CountryCode.eq(&payload.code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing_row("dim_country", &payload.code))?;

        Ok((CountryKey(row.id_country), inserted > 0))
    }

    /// Resolves a currency row, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert or read fails.
    pub async fn get_or_create_currency(
        &self,
        payload: &NewCoded,
    ) -> EtlResult<(CurrencyKey, bool)> {
        let inserted = dim_currency::Entity::insert(dim_currency::ActiveModel {
            currency_code: Set(payload.code.clone()),
            currency_name: Set(payload.name.clone()),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(dim_currency::Column::CurrencyCode)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .map_err(db_err)?;

        let row = dim_currency::Entity::find()
            .filter(dim_currency::Column::CurrencyCode.eq(&payload.code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| missing_row("dim_currency", &payload.code))?;

        Ok((CurrencyKey(row.id_currency), inserted > 0))
    }

    /// Loads every existing business key into a resolved-key map, so a run
    /// starts with the keys of all previously created rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any dimension read fails.
    pub async fn load_index(&self) -> EtlResult<ResolvedDimensions> {
        let mut index = ResolvedDimensions::new();

        let countries = dim_country::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let mut country_codes = std::collections::HashMap::new();
        for row in countries {
            country_codes.insert(row.id_country, row.country_code.clone());
            index.insert_country(&row.country_code, CountryKey(row.id_country));
        }

        for row in dim_customer::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            index.insert_customer(&row.card_code, CustomerKey(row.id_customer));
            if let Some(code) = country_codes.get(&row.id_country) {
                if code != UNKNOWN_CODE {
                    index.insert_customer_country(&row.card_code, code);
                }
            }
        }

        for row in dim_product::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            index.insert_product(&row.item_code, ProductKey(row.id_product));
        }

        for row in dim_salesperson::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            index.insert_salesperson(&row.sp_code, SalespersonKey(row.id_salesperson));
        }

        for row in dim_warehouse::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            index.insert_warehouse(&row.whs_code, WarehouseKey(row.id_warehouse));
        }

        for row in dim_currency::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            index.insert_currency(&row.currency_code, CurrencyKey(row.id_currency));
        }

        Ok(index)
    }
}

fn missing_row(table: &str, code: &str) -> EtlError {
    EtlError::Database(format!(
        "{table} row for '{code}' not found after conditional insert"
    ))
}
