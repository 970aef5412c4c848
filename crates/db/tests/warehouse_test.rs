//! Integration tests for the warehouse repositories.
//!
//! These run against a live, migrated warehouse. Set `DATABASE_URL` to run
//! them; without it every test returns early.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter};
use starlift_core::calendar::CalendarDay;
use starlift_core::dimensions::{NewCoded, NewCustomer, NewProduct};
use starlift_core::normalize::{FactRow, SourceSystem};
use starlift_db::entities::{dim_time, etl_runs, fact_sales};
use starlift_db::repositories::{
    DimensionRepository, FactRepository, ReconcileRepository, RunLogRepository, RunStatus,
    Watermarks, prepare_batch,
};
use starlift_shared::types::{
    CountryKey, CurrencyKey, CustomerKey, ProductKey, SalespersonKey, WarehouseKey,
};

async fn connect_to_warehouse() -> Option<DatabaseConnection> {
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(
        Database::connect(url)
            .await
            .expect("Failed to connect to warehouse"),
    )
}

/// Unique business key so tests can re-run against the same database.
fn unique(prefix: &str) -> String {
    format!(
        "{prefix}-{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn create_fact_dims(
    dims: &DimensionRepository,
) -> (CustomerKey, ProductKey, CurrencyKey, i32) {
    let (customer, _) = dims
        .get_or_create_customer(
            &NewCustomer {
                card_code: unique("CUST"),
                name: "Fact Test Customer".into(),
                zone: "Unknown".into(),
                country_iso2: None,
            },
            CountryKey::UNKNOWN,
        )
        .await
        .expect("customer");

    let (product, _) = dims
        .get_or_create_product(&NewProduct {
            item_code: unique("ITEM"),
            name: "Fact Test Product".into(),
            brand: "Unknown".into(),
        })
        .await
        .expect("product");

    let (currency, _) = dims
        .get_or_create_currency(&NewCoded {
            code: "USD".into(),
            name: "US Dollar".into(),
        })
        .await
        .expect("currency");

    let day = CalendarDay::from_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
    let date_key = dims.ensure_time_day(&day).await.expect("time row");

    (customer, product, currency, date_key.into_inner())
}

fn fact(
    doc: &str,
    keys: &(CustomerKey, ProductKey, CurrencyKey, i32),
    qty: rust_decimal::Decimal,
    usd: Option<rust_decimal::Decimal>,
) -> FactRow {
    FactRow {
        id_date: starlift_shared::types::DateKey(keys.3),
        id_customer: keys.0,
        id_product: keys.1,
        id_salesperson: SalespersonKey::UNKNOWN,
        id_warehouse: WarehouseKey::UNKNOWN,
        id_country: CountryKey::UNKNOWN,
        id_currency: keys.2,
        quantity: qty,
        total_usd: usd,
        total_local: None,
        source_system: SourceSystem::DbSales,
        source_doc_id: doc.into(),
        line_no: 1,
    }
}

// ============================================================================
// Test 1: time dimension rows are keyed deterministically
// ============================================================================
#[tokio::test]
async fn test_time_dimension_key_is_deterministic() {
    let Some(db) = connect_to_warehouse().await else {
        return;
    };
    let dims = DimensionRepository::new(db.clone());

    let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let day = CalendarDay::from_date(date);
    let first = dims.ensure_time_day(&day).await.unwrap();
    let second = dims.ensure_time_day(&day).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.into_inner(), 20_250_615);

    let rows = dim_time::Entity::find()
        .filter(dim_time::Column::IdDate.eq(20_250_615))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quarter, 2);
    assert_eq!(rows[0].month_name, "June");
}

// ============================================================================
// Test 2: get-or-create returns one stable key per business key
// ============================================================================
#[tokio::test]
async fn test_get_or_create_customer_is_idempotent() {
    let Some(db) = connect_to_warehouse().await else {
        return;
    };
    let dims = DimensionRepository::new(db);

    let payload = NewCustomer {
        card_code: unique("CUST"),
        name: "Idempotent Customer".into(),
        zone: "North".into(),
        country_iso2: None,
    };

    let (first, created_first) = dims
        .get_or_create_customer(&payload, CountryKey::UNKNOWN)
        .await
        .unwrap();
    let (second, created_second) = dims
        .get_or_create_customer(&payload, CountryKey::UNKNOWN)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(created_first);
    assert!(!created_second);
}

// ============================================================================
// Test 3: fact upsert replays without duplicating and refreshes values
// ============================================================================
#[tokio::test]
async fn test_fact_upsert_is_idempotent() {
    let Some(db) = connect_to_warehouse().await else {
        return;
    };
    let dims = DimensionRepository::new(db.clone());
    let facts = FactRepository::new(db.clone());
    let keys = create_fact_dims(&dims).await;

    let doc = unique("INV");
    let batch = prepare_batch(vec![fact(&doc, &keys, dec!(2), Some(dec!(50)))]);
    facts.upsert(&batch, 500).await.unwrap();

    // Replay with corrected values.
    let batch = prepare_batch(vec![fact(&doc, &keys, dec!(3), Some(dec!(75)))]);
    facts.upsert(&batch, 500).await.unwrap();

    let rows = fact_sales::Entity::find()
        .filter(fact_sales::Column::SourceDocId.eq(&doc))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, dec!(3));
    assert_eq!(rows[0].total_usd, Some(dec!(75)));
    assert_eq!(rows[0].source_system, "DB_SALES");
}

// ============================================================================
// Test 4: reconciliation derives the missing leg from the stored rate
// ============================================================================
#[tokio::test]
async fn test_reconcile_sweep_fills_local_leg() {
    let Some(db) = connect_to_warehouse().await else {
        return;
    };
    let dims = DimensionRepository::new(db.clone());
    let facts = FactRepository::new(db.clone());
    let keys = create_fact_dims(&dims).await;

    let day = CalendarDay::from_date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
    dims.apply_fx_rate(&day, dec!(530)).await.unwrap();

    let doc = unique("INV");
    let batch = prepare_batch(vec![fact(&doc, &keys, dec!(1), Some(dec!(100)))]);
    facts.upsert(&batch, 500).await.unwrap();

    ReconcileRepository::new(db.clone()).sweep().await.unwrap();

    let row = fact_sales::Entity::find()
        .filter(fact_sales::Column::SourceDocId.eq(&doc))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.total_usd, Some(dec!(100)));
    assert_eq!(row.total_local, Some(dec!(53000.0000)));

    // A second sweep leaves the derived value untouched.
    ReconcileRepository::new(db.clone()).sweep().await.unwrap();
    let row = fact_sales::Entity::find()
        .filter(fact_sales::Column::SourceDocId.eq(&doc))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.total_local, Some(dec!(53000.0000)));
}

// ============================================================================
// Test 5: run log rows carry the watermarks forward
// ============================================================================
#[tokio::test]
async fn test_run_log_records_watermarks() {
    let Some(db) = connect_to_warehouse().await else {
        return;
    };
    let run_log = RunLogRepository::new(db.clone());

    let run_id = run_log.begin_run("full").await.unwrap();
    let marks = Watermarks {
        doc_date: NaiveDate::from_ymd_opt(2025, 1, 31),
        month: Some("2025-01".into()),
    };
    run_log
        .finish_run(run_id, RunStatus::Succeeded, &marks, 42, "test run")
        .await
        .unwrap();

    let row = etl_runs::Entity::find_by_id(run_id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "succeeded");
    assert_eq!(row.watermark_doc_date, NaiveDate::from_ymd_opt(2025, 1, 31));
    assert_eq!(row.watermark_month.as_deref(), Some("2025-01"));
    assert_eq!(row.facts_loaded, 42);
    assert!(row.finished_at.is_some());
}
