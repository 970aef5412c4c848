//! Fact normalization: raw source records to canonical fact tuples.
//!
//! Each raw record is a closed tagged variant with a small fixed field set;
//! normalization converts it exactly once into the canonical [`FactRow`],
//! resolving surrogate keys through [`ResolvedDimensions`], inverting sign
//! for reversing documents, and selecting which currency leg the source
//! carries. Records missing a mandatory dimension or measure are rejected
//! with a typed reason, never silently dropped.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use starlift_shared::types::{
    CountryKey, CurrencyKey, CustomerKey, DateKey, ProductKey, SalespersonKey, WarehouseKey,
};

use crate::dimensions::{AGGREGATE_CUSTOMER_CODE, ResolvedDimensions, USD_CODE};

/// Originating source system of a fact, part of its idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceSystem {
    /// OLTP sales database (invoices and credit notes).
    DbSales,
    /// Monthly aggregated JSON feed.
    AggJson,
}

impl SourceSystem {
    /// Warehouse tag for this source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DbSales => "DB_SALES",
            Self::AggJson => "AGG_JSON",
        }
    }
}

impl std::fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OLTP document kind; credit notes reverse the sale they refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    /// Sales invoice line.
    Invoice,
    /// Credit-note line (a return; negates quantity and amount).
    CreditNote,
}

/// One raw invoice or credit-note line, header fields already joined in.
#[derive(Debug, Clone)]
pub struct RawDocLine {
    /// Document kind.
    pub kind: DocKind,
    /// Document date; mandatory.
    pub doc_date: Option<NaiveDate>,
    /// Document number (the `source_doc_id`).
    pub doc_num: String,
    /// Line number within the document (idempotency discriminator).
    pub line_no: i32,
    /// Customer business key.
    pub card_code: Option<String>,
    /// Salesperson business key.
    pub sp_code: Option<String>,
    /// Warehouse business key.
    pub whs_code: Option<String>,
    /// Product business key; mandatory.
    pub item_code: Option<String>,
    /// Quantity; mandatory. Stored positive in the source for both kinds.
    pub quantity: Option<Decimal>,
    /// Line total in the document currency.
    pub line_total: Option<Decimal>,
    /// Document currency code; USD when absent.
    pub doc_currency: Option<String>,
}

/// One flattened row of the monthly aggregated JSON feed.
#[derive(Debug, Clone)]
pub struct MonthlySales {
    /// Reporting year.
    pub year: i32,
    /// Reporting month (1-12).
    pub month: u32,
    /// Product business key.
    pub item_code: String,
    /// Units sold in the month.
    pub quantity: Decimal,
    /// Unit price in USD.
    pub unit_price_usd: Decimal,
}

/// Canonical fact tuple, ready for the load engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
    /// Time dimension key; mandatory.
    pub id_date: DateKey,
    /// Customer dimension key; mandatory.
    pub id_customer: CustomerKey,
    /// Product dimension key; mandatory.
    pub id_product: ProductKey,
    /// Salesperson key; unknown key when unresolved.
    pub id_salesperson: SalespersonKey,
    /// Warehouse key; unknown key when unresolved.
    pub id_warehouse: WarehouseKey,
    /// Country key; unknown key when unresolved.
    pub id_country: CountryKey,
    /// Currency key; unknown key when unresolved.
    pub id_currency: CurrencyKey,
    /// Signed quantity (negative for returns).
    pub quantity: Decimal,
    /// Amount in USD, if the source carried it.
    pub total_usd: Option<Decimal>,
    /// Amount in local currency, if the source carried it.
    pub total_local: Option<Decimal>,
    /// Originating source system.
    pub source_system: SourceSystem,
    /// Originating document identifier.
    pub source_doc_id: String,
    /// Stable per-line discriminator within the document.
    pub line_no: i32,
}

/// Why a raw record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RejectReason {
    /// Mandatory document date missing or invalid.
    MissingDate,
    /// Mandatory quantity missing.
    MissingQuantity,
    /// No amount in either currency.
    MissingAmount,
    /// Mandatory product business key missing.
    MissingProduct,
    /// Mandatory customer business key missing.
    MissingCustomer,
    /// Product key present but not resolved to a dimension row.
    UnresolvedProduct,
    /// Customer key present but not resolved to a dimension row.
    UnresolvedCustomer,
}

impl RejectReason {
    /// Stable label for the end-of-run summary.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingDate => "missing_date",
            Self::MissingQuantity => "missing_quantity",
            Self::MissingAmount => "missing_amount",
            Self::MissingProduct => "missing_product",
            Self::MissingCustomer => "missing_customer",
            Self::UnresolvedProduct => "unresolved_product",
            Self::UnresolvedCustomer => "unresolved_customer",
        }
    }
}

/// A rejected record, reported with its source document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Why the record was rejected.
    pub reason: RejectReason,
    /// Originating document identifier (or a synthesized one).
    pub source_doc_id: String,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rejected: {}", self.source_doc_id, self.reason.as_str())
    }
}

/// Normalizes one OLTP document line into a fact tuple.
///
/// Credit notes invert the sign of quantity and amount. The document
/// currency decides which amount leg is populated: USD fills `total_usd`,
/// the configured local currency fills `total_local`; the other leg stays
/// empty for the reconciler.
///
/// # Errors
///
/// Returns a [`Rejection`] when a mandatory field or dimension is missing.
pub fn normalize_doc_line(
    line: &RawDocLine,
    dims: &ResolvedDimensions,
) -> Result<FactRow, Rejection> {
    let reject = |reason| Rejection {
        reason,
        source_doc_id: line.doc_num.clone(),
    };

    let doc_date = line.doc_date.ok_or_else(|| reject(RejectReason::MissingDate))?;
    let quantity = line
        .quantity
        .ok_or_else(|| reject(RejectReason::MissingQuantity))?;
    let line_total = line
        .line_total
        .ok_or_else(|| reject(RejectReason::MissingAmount))?;

    let item_code = line
        .item_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| reject(RejectReason::MissingProduct))?;
    // A business key equal to the seeded sentinel code resolves to key 0;
    // a real fact never references it, so treat the line as unresolved.
    let id_product = dims
        .product(item_code)
        .filter(|key| !key.is_unknown())
        .ok_or_else(|| reject(RejectReason::UnresolvedProduct))?;

    let card_code = line
        .card_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| reject(RejectReason::MissingCustomer))?;
    let id_customer = dims
        .customer(card_code)
        .filter(|key| !key.is_unknown())
        .ok_or_else(|| reject(RejectReason::UnresolvedCustomer))?;

    let sign = match line.kind {
        DocKind::Invoice => Decimal::ONE,
        DocKind::CreditNote => Decimal::NEGATIVE_ONE,
    };
    let quantity = quantity * sign;
    let amount = line_total * sign;

    let doc_currency = line.doc_currency.as_deref().unwrap_or(USD_CODE);
    let currency_code = crate::dimensions::normalize_code(doc_currency);
    let (total_usd, total_local) = if currency_code == USD_CODE {
        (Some(amount), None)
    } else {
        (None, Some(amount))
    };

    Ok(FactRow {
        id_date: DateKey::from_date(doc_date),
        id_customer,
        id_product,
        id_salesperson: dims.salesperson_or_unknown(line.sp_code.as_deref()),
        id_warehouse: dims.warehouse_or_unknown(line.whs_code.as_deref()),
        id_country: dims.country_or_unknown(customer_country(dims, card_code).as_deref()),
        id_currency: dims.currency_or_unknown(Some(&currency_code)),
        quantity,
        total_usd,
        total_local,
        source_system: SourceSystem::DbSales,
        source_doc_id: line.doc_num.clone(),
        line_no: line.line_no,
    })
}

// The fact carries no country of its own; it is propagated from the
// customer's payload during resolution, so the lookup key is the card code.
fn customer_country(dims: &ResolvedDimensions, card_code: &str) -> Option<String> {
    dims.customer_country(card_code)
}

/// Normalizes one monthly aggregate row into a fact tuple.
///
/// The fact is anchored to the first calendar day of the reporting month,
/// attached to the reserved aggregate customer, and carries USD only.
///
/// # Errors
///
/// Returns a [`Rejection`] when the month is invalid or a mandatory
/// dimension is unresolved.
pub fn normalize_monthly(
    row: &MonthlySales,
    dims: &ResolvedDimensions,
) -> Result<FactRow, Rejection> {
    let source_doc_id = monthly_doc_id(row.year, row.month, &row.item_code);
    let reject = |reason| Rejection {
        reason,
        source_doc_id: source_doc_id.clone(),
    };

    let anchor = NaiveDate::from_ymd_opt(row.year, row.month, 1)
        .ok_or_else(|| reject(RejectReason::MissingDate))?;

    let item_code = row.item_code.trim();
    if item_code.is_empty() {
        return Err(reject(RejectReason::MissingProduct));
    }
    let id_product = dims
        .product(item_code)
        .filter(|key| !key.is_unknown())
        .ok_or_else(|| reject(RejectReason::UnresolvedProduct))?;
    let id_customer = dims
        .customer(AGGREGATE_CUSTOMER_CODE)
        .filter(|key| !key.is_unknown())
        .ok_or_else(|| reject(RejectReason::UnresolvedCustomer))?;

    Ok(FactRow {
        id_date: DateKey::from_date(anchor),
        id_customer,
        id_product,
        id_salesperson: SalespersonKey::UNKNOWN,
        id_warehouse: WarehouseKey::UNKNOWN,
        id_country: CountryKey::UNKNOWN,
        id_currency: dims.currency_or_unknown(Some(USD_CODE)),
        quantity: row.quantity,
        total_usd: Some(row.quantity * row.unit_price_usd),
        total_local: None,
        source_system: SourceSystem::AggJson,
        source_doc_id,
        line_no: 0,
    })
}

/// Document id of an aggregate fact: `YYYY-MM-ITEM`.
#[must_use]
pub fn monthly_doc_id(year: i32, month: u32, item_code: &str) -> String {
    format!(
        "{year:04}-{month:02}-{}",
        crate::dimensions::normalize_code(item_code)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::ResolvedDimensions;
    use rust_decimal_macros::dec;

    fn dims() -> ResolvedDimensions {
        let mut d = ResolvedDimensions::new();
        d.insert_customer("C001", CustomerKey(1));
        d.insert_customer(AGGREGATE_CUSTOMER_CODE, CustomerKey(2));
        d.insert_product("P1", ProductKey(10));
        d.insert_salesperson("S9", SalespersonKey(5));
        d.insert_warehouse("W1", WarehouseKey(3));
        d.insert_currency("USD", CurrencyKey(1));
        d.insert_currency("CRC", CurrencyKey(2));
        d
    }

    fn invoice_line() -> RawDocLine {
        RawDocLine {
            kind: DocKind::Invoice,
            doc_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            doc_num: "INV-1".into(),
            line_no: 1,
            card_code: Some("C001".into()),
            sp_code: Some("S9".into()),
            whs_code: Some("W1".into()),
            item_code: Some("P1".into()),
            quantity: Some(dec!(2)),
            line_total: Some(dec!(50)),
            doc_currency: Some("USD".into()),
        }
    }

    #[test]
    fn test_invoice_normalization() {
        let fact = normalize_doc_line(&invoice_line(), &dims()).unwrap();
        assert_eq!(fact.id_date.into_inner(), 20_250_110);
        assert_eq!(fact.id_customer, CustomerKey(1));
        assert_eq!(fact.id_product, ProductKey(10));
        assert_eq!(fact.id_salesperson, SalespersonKey(5));
        assert_eq!(fact.id_warehouse, WarehouseKey(3));
        assert_eq!(fact.quantity, dec!(2));
        assert_eq!(fact.total_usd, Some(dec!(50)));
        assert_eq!(fact.total_local, None);
        assert_eq!(fact.source_system, SourceSystem::DbSales);
        assert_eq!(fact.source_doc_id, "INV-1");
    }

    #[test]
    fn test_credit_note_inverts_sign() {
        let line = RawDocLine {
            kind: DocKind::CreditNote,
            doc_num: "CN-1".into(),
            quantity: Some(dec!(5)),
            line_total: Some(dec!(100)),
            ..invoice_line()
        };
        let fact = normalize_doc_line(&line, &dims()).unwrap();
        assert_eq!(fact.quantity, dec!(-5));
        assert_eq!(fact.total_usd, Some(dec!(-100)));
    }

    #[test]
    fn test_local_currency_fills_local_leg() {
        let line = RawDocLine {
            doc_currency: Some("CRC".into()),
            ..invoice_line()
        };
        let fact = normalize_doc_line(&line, &dims()).unwrap();
        assert_eq!(fact.total_usd, None);
        assert_eq!(fact.total_local, Some(dec!(50)));
        assert_eq!(fact.id_currency, CurrencyKey(2));
    }

    #[test]
    fn test_missing_mandatory_fields_reject() {
        let no_date = RawDocLine {
            doc_date: None,
            ..invoice_line()
        };
        assert_eq!(
            normalize_doc_line(&no_date, &dims()).unwrap_err().reason,
            RejectReason::MissingDate
        );

        let no_qty = RawDocLine {
            quantity: None,
            ..invoice_line()
        };
        assert_eq!(
            normalize_doc_line(&no_qty, &dims()).unwrap_err().reason,
            RejectReason::MissingQuantity
        );

        let no_item = RawDocLine {
            item_code: Some("  ".into()),
            ..invoice_line()
        };
        assert_eq!(
            normalize_doc_line(&no_item, &dims()).unwrap_err().reason,
            RejectReason::MissingProduct
        );
    }

    #[test]
    fn test_sentinel_business_key_rejects_the_line_only() {
        let mut d = dims();
        d.insert_product(crate::dimensions::UNKNOWN_CODE, ProductKey::UNKNOWN);
        d.insert_customer(crate::dimensions::UNKNOWN_CODE, CustomerKey::UNKNOWN);

        let line = RawDocLine {
            item_code: Some("UNK".into()),
            ..invoice_line()
        };
        assert_eq!(
            normalize_doc_line(&line, &d).unwrap_err().reason,
            RejectReason::UnresolvedProduct
        );

        let line = RawDocLine {
            card_code: Some("unk".into()),
            ..invoice_line()
        };
        assert_eq!(
            normalize_doc_line(&line, &d).unwrap_err().reason,
            RejectReason::UnresolvedCustomer
        );

        // A sibling line with real keys still passes.
        assert!(normalize_doc_line(&invoice_line(), &d).is_ok());
    }

    #[test]
    fn test_unresolved_optional_dims_pin_to_unknown() {
        let line = RawDocLine {
            sp_code: None,
            whs_code: Some("W-NOPE".into()),
            ..invoice_line()
        };
        let fact = normalize_doc_line(&line, &dims()).unwrap();
        assert_eq!(fact.id_salesperson, SalespersonKey::UNKNOWN);
        assert_eq!(fact.id_warehouse, WarehouseKey::UNKNOWN);
        assert_eq!(fact.id_country, CountryKey::UNKNOWN);
    }

    #[test]
    fn test_country_is_inherited_from_customer() {
        let mut d = dims();
        d.insert_country("CR", CountryKey(4));
        d.insert_customer_country("C001", "cr");
        let fact = normalize_doc_line(&invoice_line(), &d).unwrap();
        assert_eq!(fact.id_country, CountryKey(4));
    }

    #[test]
    fn test_monthly_anchors_to_first_of_month() {
        let row = MonthlySales {
            year: 2025,
            month: 1,
            item_code: "p1".into(),
            quantity: dec!(10),
            unit_price_usd: dec!(50),
        };
        let fact = normalize_monthly(&row, &dims()).unwrap();
        assert_eq!(fact.id_date.into_inner(), 20_250_101);
        assert_eq!(fact.id_customer, CustomerKey(2));
        assert_eq!(fact.total_usd, Some(dec!(500)));
        assert_eq!(fact.total_local, None);
        assert_eq!(fact.source_system, SourceSystem::AggJson);
        assert_eq!(fact.source_doc_id, "2025-01-P1");
        assert_eq!(fact.id_warehouse, WarehouseKey::UNKNOWN);
    }

    #[test]
    fn test_monthly_invalid_month_rejects() {
        let row = MonthlySales {
            year: 2025,
            month: 13,
            item_code: "P1".into(),
            quantity: dec!(1),
            unit_price_usd: dec!(1),
        };
        assert_eq!(
            normalize_monthly(&row, &dims()).unwrap_err().reason,
            RejectReason::MissingDate
        );
    }

    #[test]
    fn test_end_to_end_scenario_shares_product_and_splits_dates() {
        let d = dims();
        let inv = normalize_doc_line(&invoice_line(), &d).unwrap();
        let cn = normalize_doc_line(
            &RawDocLine {
                kind: DocKind::CreditNote,
                doc_num: "CN-1".into(),
                quantity: Some(dec!(1)),
                line_total: Some(dec!(25)),
                ..invoice_line()
            },
            &d,
        )
        .unwrap();
        let agg = normalize_monthly(
            &MonthlySales {
                year: 2025,
                month: 1,
                item_code: "P1".into(),
                quantity: dec!(10),
                unit_price_usd: dec!(50),
            },
            &d,
        )
        .unwrap();

        assert_eq!(inv.quantity, dec!(2));
        assert_eq!(inv.total_usd, Some(dec!(50)));
        assert_eq!(cn.quantity, dec!(-1));
        assert_eq!(cn.total_usd, Some(dec!(-25)));
        assert_eq!(agg.quantity, dec!(10));
        assert_eq!(agg.total_usd, Some(dec!(500)));

        // One shared product key, two distinct time rows.
        assert_eq!(inv.id_product, cn.id_product);
        assert_eq!(inv.id_product, agg.id_product);
        assert_eq!(inv.id_date, cn.id_date);
        assert_ne!(inv.id_date, agg.id_date);
    }
}
