//! Initial warehouse migration.
//!
//! Creates the star schema (seven dimensions plus `fact_sales`), the run
//! log, the local-amount view, and the seeded reserved rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: DIMENSIONS
        // ============================================================
        db.execute_unprepared(DIM_TIME_SQL).await?;
        db.execute_unprepared(DIM_COUNTRY_SQL).await?;
        db.execute_unprepared(DIM_CUSTOMER_SQL).await?;
        db.execute_unprepared(DIM_PRODUCT_SQL).await?;
        db.execute_unprepared(DIM_SALESPERSON_SQL).await?;
        db.execute_unprepared(DIM_WAREHOUSE_SQL).await?;
        db.execute_unprepared(DIM_CURRENCY_SQL).await?;

        // ============================================================
        // PART 2: FACT TABLE
        // ============================================================
        db.execute_unprepared(FACT_SALES_SQL).await?;

        // ============================================================
        // PART 3: RUN LOG
        // ============================================================
        db.execute_unprepared(ETL_RUNS_SQL).await?;

        // ============================================================
        // PART 4: VIEWS
        // ============================================================
        db.execute_unprepared(VIEWS_SQL).await?;

        // ============================================================
        // PART 5: SEED DATA
        // ============================================================
        db.execute_unprepared(SEED_UNKNOWN_ROWS_SQL).await?;
        db.execute_unprepared(SEED_CURRENCIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const DIM_TIME_SQL: &str = r"
-- Time dimension; the key is the YYYYMMDD encoding of the date, so the
-- same calendar day can never produce two rows.
CREATE TABLE dim_time (
    id_date      INTEGER PRIMARY KEY,
    date         DATE NOT NULL UNIQUE,
    year         INTEGER NOT NULL,
    month        INTEGER NOT NULL,
    day          INTEGER NOT NULL,
    quarter      INTEGER NOT NULL,
    month_name   VARCHAR(20) NOT NULL,
    fx_usd_local NUMERIC(18, 6)
);
";

const DIM_COUNTRY_SQL: &str = r"
CREATE TABLE dim_country (
    id_country   SERIAL PRIMARY KEY,
    country_code VARCHAR(10) NOT NULL UNIQUE,
    country_name VARCHAR(100) NOT NULL
);
";

const DIM_CUSTOMER_SQL: &str = r"
CREATE TABLE dim_customer (
    id_customer   SERIAL PRIMARY KEY,
    card_code     VARCHAR(50) NOT NULL UNIQUE,
    customer_name VARCHAR(200) NOT NULL,
    zone          VARCHAR(100) NOT NULL,
    id_country    INTEGER NOT NULL REFERENCES dim_country(id_country)
);
";

const DIM_PRODUCT_SQL: &str = r"
CREATE TABLE dim_product (
    id_product   SERIAL PRIMARY KEY,
    item_code    VARCHAR(50) NOT NULL UNIQUE,
    product_name VARCHAR(200) NOT NULL,
    brand        VARCHAR(100) NOT NULL
);
";

const DIM_SALESPERSON_SQL: &str = r"
CREATE TABLE dim_salesperson (
    id_salesperson SERIAL PRIMARY KEY,
    sp_code        VARCHAR(50) NOT NULL UNIQUE,
    sp_name        VARCHAR(200) NOT NULL
);
";

const DIM_WAREHOUSE_SQL: &str = r"
CREATE TABLE dim_warehouse (
    id_warehouse SERIAL PRIMARY KEY,
    whs_code     VARCHAR(50) NOT NULL UNIQUE,
    whs_name     VARCHAR(200) NOT NULL
);
";

const DIM_CURRENCY_SQL: &str = r"
CREATE TABLE dim_currency (
    id_currency   SERIAL PRIMARY KEY,
    currency_code VARCHAR(10) NOT NULL UNIQUE,
    currency_name VARCHAR(100) NOT NULL
);
";

const FACT_SALES_SQL: &str = r"
CREATE TABLE fact_sales (
    id_fact        BIGSERIAL PRIMARY KEY,
    id_date        INTEGER NOT NULL REFERENCES dim_time(id_date),
    id_customer    INTEGER NOT NULL REFERENCES dim_customer(id_customer),
    id_product     INTEGER NOT NULL REFERENCES dim_product(id_product),
    id_salesperson INTEGER NOT NULL REFERENCES dim_salesperson(id_salesperson),
    id_warehouse   INTEGER NOT NULL REFERENCES dim_warehouse(id_warehouse),
    id_country     INTEGER NOT NULL REFERENCES dim_country(id_country),
    id_currency    INTEGER NOT NULL REFERENCES dim_currency(id_currency),
    quantity       NUMERIC(18, 4) NOT NULL,
    total_usd      NUMERIC(18, 4),
    total_local    NUMERIC(18, 4),
    source_system  VARCHAR(20) NOT NULL,
    source_doc_id  VARCHAR(100) NOT NULL,
    line_no        INTEGER NOT NULL,
    load_ts        TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_fact_sales_source UNIQUE (source_system, source_doc_id, line_no)
);

CREATE INDEX idx_fact_sales_date ON fact_sales(id_date);
CREATE INDEX idx_fact_sales_customer ON fact_sales(id_customer);
CREATE INDEX idx_fact_sales_product ON fact_sales(id_product);
";

const ETL_RUNS_SQL: &str = r"
CREATE TABLE etl_runs (
    id                 BIGSERIAL PRIMARY KEY,
    run_mode           VARCHAR(20) NOT NULL,
    status             VARCHAR(20) NOT NULL,
    started_at         TIMESTAMPTZ NOT NULL DEFAULT now(),
    finished_at        TIMESTAMPTZ,
    watermark_doc_date DATE,
    watermark_month    VARCHAR(7),
    facts_loaded       BIGINT NOT NULL DEFAULT 0,
    summary            TEXT
);
";

const VIEWS_SQL: &str = r"
-- Facts with a best-effort local amount: the stored leg when present,
-- otherwise derived from USD and the date's rate.
CREATE VIEW v_fact_sales_local AS
SELECT
    f.*,
    COALESCE(f.total_local, ROUND(f.total_usd * t.fx_usd_local, 4)) AS total_local_effective
FROM fact_sales f
JOIN dim_time t ON t.id_date = f.id_date;
";

const SEED_UNKNOWN_ROWS_SQL: &str = r"
-- Reserved key 0 rows so unresolved references load as a real dimension
-- row instead of NULL.
INSERT INTO dim_country (id_country, country_code, country_name)
VALUES (0, 'UNK', 'Unknown');

INSERT INTO dim_customer (id_customer, card_code, customer_name, zone, id_country)
VALUES (0, 'UNK', 'Unknown', 'Unknown', 0);

INSERT INTO dim_product (id_product, item_code, product_name, brand)
VALUES (0, 'UNK', 'Unknown', 'Unknown');

INSERT INTO dim_salesperson (id_salesperson, sp_code, sp_name)
VALUES (0, 'UNK', 'Unknown');

INSERT INTO dim_warehouse (id_warehouse, whs_code, whs_name)
VALUES (0, 'UNK', 'Unknown');

INSERT INTO dim_currency (id_currency, currency_code, currency_name)
VALUES (0, 'UNK', 'Unknown');
";

const SEED_CURRENCIES_SQL: &str = r"
INSERT INTO dim_currency (currency_code, currency_name)
VALUES
    ('USD', 'US Dollar'),
    ('CRC', 'Costa Rican Colon');
";

const DROP_ALL_SQL: &str = r"
DROP VIEW IF EXISTS v_fact_sales_local;
DROP TABLE IF EXISTS etl_runs;
DROP TABLE IF EXISTS fact_sales;
DROP TABLE IF EXISTS dim_customer;
DROP TABLE IF EXISTS dim_country;
DROP TABLE IF EXISTS dim_product;
DROP TABLE IF EXISTS dim_salesperson;
DROP TABLE IF EXISTS dim_warehouse;
DROP TABLE IF EXISTS dim_currency;
DROP TABLE IF EXISTS dim_time;
";
