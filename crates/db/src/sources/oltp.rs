//! OLTP sales database reader.
//!
//! Reads invoice and credit-note lines (header fields joined in) plus the
//! master tables used for dimension enrichment. The OLTP schema is the
//! legacy one: `oinv`/`inv1` for invoices, `orin`/`rin1` for credit notes,
//! and `ocrd`/`oitm`/`oslp`/`owhs`/`ocry`/`marcas`/`zonas` for masters.
//!
//! Incremental runs push the watermark predicate (`doc_date > $1`) down to
//! the source instead of filtering in memory.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DbBackend, FromQueryResult, Statement};
use starlift_core::dimensions::{CustomerMaster, MasterData, ProductMaster, normalize_code};
use starlift_core::normalize::{DocKind, RawDocLine};
use starlift_shared::EtlResult;
use tracing::debug;

use crate::db_err;

/// Reader over the OLTP sales database.
#[derive(Debug, Clone)]
pub struct OltpSource {
    db: DatabaseConnection,
}

#[derive(Debug, FromQueryResult)]
struct DocLineRow {
    doc_num: String,
    doc_date: Option<NaiveDate>,
    card_code: Option<String>,
    slp_code: Option<String>,
    doc_cur: Option<String>,
    line_num: i32,
    item_code: Option<String>,
    quantity: Option<Decimal>,
    line_total: Option<Decimal>,
    whs_code: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct CustomerRow {
    card_code: String,
    card_name: Option<String>,
    zone_code: Option<String>,
    country: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct ProductRow {
    item_code: String,
    item_name: Option<String>,
    brand_code: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct CodeNameRow {
    code: String,
    name: Option<String>,
}

impl OltpSource {
    /// Creates a reader over an established OLTP connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetches every master table into the enrichment maps.
    ///
    /// # Errors
    ///
    /// Returns an error if a source query fails.
    pub async fn fetch_masters(&self) -> EtlResult<MasterData> {
        let mut masters = MasterData::default();

        for row in self.select::<CustomerRow>(CUSTOMERS_SQL, None).await? {
            masters.customers.insert(
                normalize_code(&row.card_code),
                CustomerMaster {
                    name: row.card_name.unwrap_or_else(|| row.card_code.clone()),
                    zone_code: row.zone_code,
                    country_iso2: row.country,
                },
            );
        }

        for row in self.select::<ProductRow>(PRODUCTS_SQL, None).await? {
            masters.products.insert(
                normalize_code(&row.item_code),
                ProductMaster {
                    name: row.item_name.unwrap_or_else(|| row.item_code.clone()),
                    brand_code: row.brand_code,
                },
            );
        }

        for (sql, target) in [
            (SALESPERSONS_SQL, &mut masters.salespersons),
            (WAREHOUSES_SQL, &mut masters.warehouses),
            (COUNTRIES_SQL, &mut masters.countries),
            (BRANDS_SQL, &mut masters.brands),
            (ZONES_SQL, &mut masters.zones),
        ] {
            for row in self.select::<CodeNameRow>(sql, None).await? {
                let name = row.name.unwrap_or_else(|| row.code.clone());
                target.insert(normalize_code(&row.code), name);
            }
        }

        debug!(
            customers = masters.customers.len(),
            products = masters.products.len(),
            "fetched OLTP masters"
        );
        Ok(masters)
    }

    /// Fetches invoice and credit-note lines, newest schema fields joined
    /// from the header. With `since`, only documents dated strictly after
    /// the watermark are read.
    ///
    /// # Errors
    ///
    /// Returns an error if a source query fails.
    pub async fn fetch_doc_lines(
        &self,
        since: Option<NaiveDate>,
    ) -> EtlResult<Vec<RawDocLine>> {
        let mut lines = Vec::new();

        for row in self
            .select::<DocLineRow>(&doc_lines_sql("oinv", "inv1", since.is_some()), since)
            .await?
        {
            lines.push(to_raw_line(row, DocKind::Invoice));
        }

        for row in self
            .select::<DocLineRow>(&doc_lines_sql("orin", "rin1", since.is_some()), since)
            .await?
        {
            lines.push(to_raw_line(row, DocKind::CreditNote));
        }

        debug!(lines = lines.len(), incremental = since.is_some(), "fetched OLTP document lines");
        Ok(lines)
    }

    async fn select<T: FromQueryResult>(
        &self,
        sql: &str,
        since: Option<NaiveDate>,
    ) -> EtlResult<Vec<T>> {
        let stmt = match since {
            Some(date) => {
                Statement::from_sql_and_values(DbBackend::Postgres, sql, [date.into()])
            }
            None => Statement::from_string(DbBackend::Postgres, sql),
        };

        T::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(db_err)
    }
}

fn to_raw_line(row: DocLineRow, kind: DocKind) -> RawDocLine {
    RawDocLine {
        kind,
        doc_date: row.doc_date,
        doc_num: row.doc_num,
        line_no: row.line_num,
        card_code: row.card_code,
        sp_code: row.slp_code,
        whs_code: row.whs_code,
        item_code: row.item_code,
        quantity: row.quantity,
        line_total: row.line_total,
        doc_currency: row.doc_cur,
    }
}

fn doc_lines_sql(header: &str, lines: &str, incremental: bool) -> String {
    let watermark = if incremental {
        "WHERE h.doc_date > $1"
    } else {
        ""
    };
    format!(
        "SELECT CAST(h.doc_num AS TEXT) AS doc_num, h.doc_date, h.card_code, \
         CAST(h.slp_code AS TEXT) AS slp_code, h.doc_cur, \
         l.line_num, l.item_code, l.quantity, l.line_total, l.whs_code \
         FROM {header} h JOIN {lines} l ON l.doc_entry = h.doc_entry \
         {watermark} ORDER BY h.doc_num, l.line_num"
    )
}

const CUSTOMERS_SQL: &str =
    "SELECT card_code, card_name, zone_code, country FROM ocrd WHERE card_type = 'C'";

const PRODUCTS_SQL: &str = "SELECT item_code, item_name, brand_code FROM oitm";

const SALESPERSONS_SQL: &str =
    "SELECT CAST(slp_code AS TEXT) AS code, slp_name AS name FROM oslp";

const WAREHOUSES_SQL: &str = "SELECT whs_code AS code, whs_name AS name FROM owhs";

const COUNTRIES_SQL: &str = "SELECT code, name FROM ocry";

const BRANDS_SQL: &str = "SELECT code, name FROM marcas";

const ZONES_SQL: &str = "SELECT code, name FROM zonas";
