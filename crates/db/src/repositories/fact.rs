//! Fact repository: idempotent chunked upsert of canonical fact tuples.
//!
//! The natural key `(source_system, source_doc_id, line_no)` makes the load
//! re-runnable: a conflict updates the row with the fresh source values
//! instead of duplicating it. Chunks commit independently, so a failure
//! loses at most one chunk of progress and the next run repairs it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set, TransactionTrait};
use starlift_core::normalize::{FactRow, SourceSystem};
use starlift_shared::{EtlError, EtlResult};
use tracing::debug;

use crate::db_err;
use crate::entities::fact_sales;

/// Collapses duplicate idempotency keys within one batch, keeping the last
/// occurrence in place.
///
/// Postgres rejects a multi-row upsert that touches the same conflict key
/// twice, so this must run before [`FactRepository::upsert`].
#[must_use]
pub fn prepare_batch(rows: Vec<FactRow>) -> Vec<FactRow> {
    let mut out: Vec<FactRow> = Vec::with_capacity(rows.len());
    let mut seen: HashMap<(SourceSystem, String, i32), usize> = HashMap::new();
    let mut collapsed = 0usize;

    for row in rows {
        let key = (row.source_system, row.source_doc_id.clone(), row.line_no);
        match seen.entry(key) {
            Entry::Occupied(slot) => {
                out[*slot.get()] = row;
                collapsed += 1;
            }
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(row);
            }
        }
    }

    if collapsed > 0 {
        debug!(collapsed, "collapsed duplicate fact keys within batch");
    }
    out
}

/// Checks every fact's mandatory surrogate keys before any write.
///
/// Mandatory dimensions (date, customer, product) must carry a real key,
/// not the unknown sentinel, and at least one amount leg must be populated.
/// The whole batch is rejected on the first violation; nothing is committed.
///
/// # Errors
///
/// Returns [`EtlError::Referential`] naming the offending source document.
pub fn validate_batch(rows: &[FactRow]) -> EtlResult<()> {
    for row in rows {
        let violation = if row.id_date.into_inner() <= 0 {
            Some("unresolved time key")
        } else if row.id_customer.is_unknown() {
            Some("customer resolved to the unknown sentinel")
        } else if row.id_product.is_unknown() {
            Some("product resolved to the unknown sentinel")
        } else if row.total_usd.is_none() && row.total_local.is_none() {
            Some("no amount in either currency")
        } else {
            None
        };
        if let Some(message) = violation {
            return Err(EtlError::Referential {
                source_doc_id: row.source_doc_id.clone(),
                message: message.to_string(),
            });
        }
    }
    Ok(())
}

/// Fact repository for the idempotent load.
#[derive(Debug, Clone)]
pub struct FactRepository {
    db: DatabaseConnection,
}

impl FactRepository {
    /// Creates a new fact repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Upserts a batch of facts in per-chunk transactions.
    ///
    /// Returns the number of rows written. The batch must already be
    /// deduplicated with [`prepare_batch`]; it is validated as a whole
    /// with [`validate_batch`] before the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or a chunk fails to commit;
    /// previously committed chunks stay in place.
    pub async fn upsert(&self, rows: &[FactRow], chunk_size: usize) -> EtlResult<usize> {
        validate_batch(rows)?;

        let mut written = 0usize;

        for chunk in rows.chunks(chunk_size.max(1)) {
            let txn = self.db.begin().await.map_err(db_err)?;

            let models: Vec<fact_sales::ActiveModel> = chunk.iter().map(to_active).collect();
            fact_sales::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        fact_sales::Column::SourceSystem,
                        fact_sales::Column::SourceDocId,
                        fact_sales::Column::LineNo,
                    ])
                    .update_columns([
                        fact_sales::Column::IdDate,
                        fact_sales::Column::IdCustomer,
                        fact_sales::Column::IdProduct,
                        fact_sales::Column::IdSalesperson,
                        fact_sales::Column::IdWarehouse,
                        fact_sales::Column::IdCountry,
                        fact_sales::Column::IdCurrency,
                        fact_sales::Column::Quantity,
                        fact_sales::Column::TotalUsd,
                        fact_sales::Column::TotalLocal,
                        fact_sales::Column::LoadTs,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(db_err)?;

            txn.commit().await.map_err(db_err)?;
            written += chunk.len();
        }

        Ok(written)
    }
}

fn to_active(row: &FactRow) -> fact_sales::ActiveModel {
    fact_sales::ActiveModel {
        id_date: Set(row.id_date.into_inner()),
        id_customer: Set(row.id_customer.into_inner()),
        id_product: Set(row.id_product.into_inner()),
        id_salesperson: Set(row.id_salesperson.into_inner()),
        id_warehouse: Set(row.id_warehouse.into_inner()),
        id_country: Set(row.id_country.into_inner()),
        id_currency: Set(row.id_currency.into_inner()),
        quantity: Set(row.quantity),
        total_usd: Set(row.total_usd),
        total_local: Set(row.total_local),
        source_system: Set(row.source_system.as_str().to_string()),
        source_doc_id: Set(row.source_doc_id.clone()),
        line_no: Set(row.line_no),
        load_ts: Set(chrono::Utc::now().into()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use starlift_shared::types::{
        CountryKey, CurrencyKey, CustomerKey, DateKey, ProductKey, SalespersonKey, WarehouseKey,
    };

    fn fact(doc: &str, line: i32, qty: i64) -> FactRow {
        FactRow {
            id_date: DateKey(20_250_110),
            id_customer: CustomerKey(1),
            id_product: ProductKey(1),
            id_salesperson: SalespersonKey::UNKNOWN,
            id_warehouse: WarehouseKey::UNKNOWN,
            id_country: CountryKey::UNKNOWN,
            id_currency: CurrencyKey(1),
            quantity: rust_decimal::Decimal::from(qty),
            total_usd: Some(dec!(10)),
            total_local: None,
            source_system: SourceSystem::DbSales,
            source_doc_id: doc.into(),
            line_no: line,
        }
    }

    #[test]
    fn test_prepare_batch_keeps_distinct_keys() {
        let batch = prepare_batch(vec![fact("INV-1", 1, 1), fact("INV-1", 2, 1), fact("INV-2", 1, 1)]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_prepare_batch_last_duplicate_wins_in_place() {
        let batch = prepare_batch(vec![
            fact("INV-1", 1, 1),
            fact("INV-2", 1, 1),
            fact("INV-1", 1, 5),
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].source_doc_id, "INV-1");
        assert_eq!(batch[0].quantity, dec!(5));
        assert_eq!(batch[1].source_doc_id, "INV-2");
    }

    #[test]
    fn test_validate_batch_accepts_resolved_facts() {
        assert!(validate_batch(&[fact("INV-1", 1, 1), fact("INV-2", 1, 2)]).is_ok());
    }

    #[test]
    fn test_validate_batch_rejects_whole_batch_on_unknown_mandatory_key() {
        let mut bad = fact("INV-2", 1, 1);
        bad.id_product = ProductKey::UNKNOWN;

        let err = validate_batch(&[fact("INV-1", 1, 1), bad]).unwrap_err();
        match err {
            EtlError::Referential { source_doc_id, .. } => {
                assert_eq!(source_doc_id, "INV-2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_batch_rejects_fact_with_no_amount_leg() {
        let mut bad = fact("INV-1", 1, 1);
        bad.total_usd = None;
        bad.total_local = None;
        assert!(validate_batch(&[bad]).is_err());
    }
}
