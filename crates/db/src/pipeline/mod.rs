//! Pipeline orchestration: full and incremental runs.
//!
//! A run proceeds source by source: FX rates into the time dimension,
//! OLTP document lines, the monthly JSON feed, then the reconciliation
//! sweep over the whole fact table. Stages share one resolved-dimension
//! index; every stage is idempotent, so a failed run is repaired by simply
//! running again.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use sea_orm::DatabaseConnection;
use starlift_core::calendar::CalendarDay;
use starlift_core::dimensions::{
    AGGREGATE_CUSTOMER_CODE, MasterData, ResolvedDimensions, UNKNOWN_CODE, USD_CODE,
    aggregate_customer, coded_payload, customer_payload, normalize_code, product_payload,
};
use starlift_core::normalize::{
    MonthlySales, RawDocLine, normalize_doc_line, normalize_monthly,
};
use starlift_core::report::RunSummary;
use starlift_core::sources::aggregate::read_monthly_feed;
use starlift_core::sources::fx::read_fx_workbook;
use starlift_shared::types::CountryKey;
use starlift_shared::{EtlConfig, EtlResult, retry::with_retry};
use tracing::info;

use crate::repositories::{
    DimensionRepository, FactRepository, ReconcileRepository, RunLogRepository, RunStatus,
    Watermarks, prepare_batch,
};
use crate::sources::OltpSource;

/// How much history a run re-reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Re-read every source from the beginning.
    Full,
    /// Read only past the watermarks of the last succeeded run.
    Incremental,
}

impl RunMode {
    /// Stable label for logs and the run log table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

/// Per-run switches.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Full or incremental history.
    pub mode: RunMode,
    /// Skip the FX workbook stage.
    pub skip_fx: bool,
    /// Skip the OLTP document stage.
    pub skip_oltp: bool,
    /// Skip the monthly JSON stage.
    pub skip_json: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Full,
            skip_fx: false,
            skip_oltp: false,
            skip_json: false,
        }
    }
}

/// The pipeline orchestrator.
pub struct Pipeline {
    config: EtlConfig,
    warehouse: DatabaseConnection,
}

impl Pipeline {
    /// Connects to the warehouse and prepares a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the warehouse is unreachable after retries.
    pub async fn connect(config: EtlConfig) -> EtlResult<Self> {
        let warehouse = with_retry(config.retry, "connect warehouse", || {
            crate::connect(&config.warehouse)
        })
        .await?;

        Ok(Self { config, warehouse })
    }

    /// Executes one run end to end and records it in the run log.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; the run log row is closed as failed
    /// and watermarks stay where the last succeeded run left them.
    pub async fn run(&self, options: &RunOptions) -> EtlResult<RunSummary> {
        let run_log = RunLogRepository::new(self.warehouse.clone());
        let run_id = with_retry(self.config.retry, "open run log", || {
            run_log.begin_run(options.mode.as_str())
        })
        .await?;
        let previous = with_retry(self.config.retry, "read watermarks", || {
            run_log.latest_watermarks()
        })
        .await?;
        info!(
            mode = options.mode.as_str(),
            run_id,
            doc_date_watermark = ?previous.doc_date,
            month_watermark = ?previous.month,
            "run started"
        );

        match self.execute(options, &previous).await {
            Ok((summary, new_marks)) => {
                let merged = previous.merged(&new_marks);
                #[allow(clippy::cast_possible_wrap)]
                let facts_loaded = summary.facts_loaded() as i64;
                let report = summary.to_string();
                with_retry(self.config.retry, "close run log", || {
                    run_log.finish_run(run_id, RunStatus::Succeeded, &merged, facts_loaded, &report)
                })
                .await?;
                info!(run_id, %summary, "run succeeded");
                Ok(summary)
            }
            Err(err) => {
                let message = err.to_string();
                let closed = with_retry(self.config.retry, "close run log", || {
                    run_log.finish_run(run_id, RunStatus::Failed, &previous, 0, &message)
                })
                .await;
                if let Err(log_err) = closed {
                    tracing::error!(run_id, error = %log_err, "failed to close run log row");
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        options: &RunOptions,
        previous: &Watermarks,
    ) -> EtlResult<(RunSummary, Watermarks)> {
        let incremental = options.mode == RunMode::Incremental;
        let dims = DimensionRepository::new(self.warehouse.clone());
        let facts = FactRepository::new(self.warehouse.clone());

        let mut summary = RunSummary::new();
        let mut new_marks = Watermarks::default();
        let mut index = with_retry(self.config.retry, "load dimension index", || {
            dims.load_index()
        })
        .await?;

        if !options.skip_fx {
            self.run_fx_stage(&dims, &mut summary).await?;
        }

        let mut masters = MasterData::default();
        if !options.skip_oltp {
            let source_db = with_retry(self.config.retry, "connect source", || {
                crate::connect(&self.config.source)
            })
            .await?;
            let source = OltpSource::new(source_db);
            masters = with_retry(self.config.retry, "fetch source masters", || {
                source.fetch_masters()
            })
            .await?;

            let since = if incremental { previous.doc_date } else { None };
            let lines = with_retry(self.config.retry, "fetch document lines", || {
                source.fetch_doc_lines(since)
            })
            .await?;

            self.resolve_doc_dimensions(&dims, &mut index, &masters, &lines, &mut summary)
                .await?;

            let mut rows = Vec::with_capacity(lines.len());
            for line in &lines {
                match normalize_doc_line(line, &index) {
                    Ok(fact) => rows.push(fact),
                    Err(rejection) => summary.record_rejection(rejection),
                }
            }

            let batch = prepare_batch(rows);
            summary.oltp_facts = with_retry(self.config.retry, "upsert oltp facts", || {
                facts.upsert(&batch, self.config.load.chunk_size)
            })
            .await?;
            new_marks.doc_date = lines.iter().filter_map(|l| l.doc_date).max();
        }

        if !options.skip_json {
            let rows = read_monthly_feed(Path::new(&self.config.files.json_path))?;
            let rows: Vec<MonthlySales> = if incremental {
                let mark = previous.month.clone().unwrap_or_default();
                rows.into_iter()
                    .filter(|r| month_key(r.year, r.month) > mark)
                    .collect()
            } else {
                rows
            };

            Self::resolve_monthly_dimensions(&dims, &mut index, &masters, &rows, &mut summary)
                .await?;

            let mut normalized = Vec::with_capacity(rows.len());
            for row in &rows {
                match normalize_monthly(row, &index) {
                    Ok(fact) => normalized.push(fact),
                    Err(rejection) => summary.record_rejection(rejection),
                }
            }

            let batch = prepare_batch(normalized);
            summary.json_facts = with_retry(self.config.retry, "upsert json facts", || {
                facts.upsert(&batch, self.config.load.chunk_size)
            })
            .await?;
            new_marks.month = rows.iter().map(|r| month_key(r.year, r.month)).max();
        }

        let reconciler = ReconcileRepository::new(self.warehouse.clone());
        let counts = with_retry(self.config.retry, "reconcile sweep", || reconciler.sweep()).await?;
        summary.reconciled_local = counts.filled_local;
        summary.reconciled_usd = counts.filled_usd;
        summary.facts_awaiting_rate = counts.awaiting_rate;

        Ok((summary, new_marks))
    }

    async fn run_fx_stage(
        &self,
        dims: &DimensionRepository,
        summary: &mut RunSummary,
    ) -> EtlResult<()> {
        let sheet = read_fx_workbook(
            Path::new(&self.config.files.fx_path),
            self.config.files.fx_sheet.as_deref(),
        )?;
        summary.fx_rows_skipped = sheet.skipped;

        for row in &sheet.rows {
            let day = CalendarDay::from_date(row.date);
            with_retry(self.config.retry, "apply fx rate", || {
                dims.apply_fx_rate(&day, row.rate)
            })
            .await?;
            summary.fx_rows_loaded += 1;
        }

        info!(
            loaded = summary.fx_rows_loaded,
            skipped = summary.fx_rows_skipped,
            "FX stage finished"
        );
        Ok(())
    }

    /// Ensures every dimension row referenced by a batch of document lines
    /// exists, recording new keys in the index.
    async fn resolve_doc_dimensions(
        &self,
        dims: &DimensionRepository,
        index: &mut ResolvedDimensions,
        masters: &MasterData,
        lines: &[RawDocLine],
        summary: &mut RunSummary,
    ) -> EtlResult<()> {
        for date in collect(lines.iter().filter_map(|l| l.doc_date)) {
            dims.ensure_time_day(&CalendarDay::from_date(date)).await?;
        }

        for code in collect(lines.iter().filter_map(|l| l.card_code.as_deref().map(normalize_code)))
        {
            if index.contains_customer(&code) {
                continue;
            }
            let payload = customer_payload(&code, masters);
            let country = Self::resolve_country(
                dims,
                index,
                masters,
                payload.country_iso2.as_deref(),
                summary,
            )
            .await?;
            let (key, created) = dims.get_or_create_customer(&payload, country).await?;
            index.insert_customer(&code, key);
            if let Some(iso) = &payload.country_iso2 {
                index.insert_customer_country(&code, iso);
            }
            if created {
                summary.dimensions_created += 1;
            }
        }

        for code in collect(lines.iter().filter_map(|l| l.item_code.as_deref().map(normalize_code)))
        {
            if index.product(&code).is_some() {
                continue;
            }
            let (key, created) = dims.get_or_create_product(&product_payload(&code, masters)).await?;
            index.insert_product(&code, key);
            if created {
                summary.dimensions_created += 1;
            }
        }

        for code in collect(lines.iter().filter_map(|l| l.sp_code.as_deref().map(normalize_code))) {
            if !index.salesperson_or_unknown(Some(&code)).is_unknown() || code == UNKNOWN_CODE {
                continue;
            }
            let (key, created) = dims
                .get_or_create_salesperson(&coded_payload(&code, &masters.salespersons))
                .await?;
            index.insert_salesperson(&code, key);
            if created {
                summary.dimensions_created += 1;
            }
        }

        for code in collect(lines.iter().filter_map(|l| l.whs_code.as_deref().map(normalize_code)))
        {
            if !index.warehouse_or_unknown(Some(&code)).is_unknown() || code == UNKNOWN_CODE {
                continue;
            }
            let (key, created) = dims
                .get_or_create_warehouse(&coded_payload(&code, &masters.warehouses))
                .await?;
            index.insert_warehouse(&code, key);
            if created {
                summary.dimensions_created += 1;
            }
        }

        let mut currencies: BTreeSet<String> = lines
            .iter()
            .map(|l| normalize_code(l.doc_currency.as_deref().unwrap_or(USD_CODE)))
            .collect();
        currencies.insert(USD_CODE.to_string());
        currencies.insert(normalize_code(&self.config.load.local_currency));
        for code in currencies {
            if !index.currency_or_unknown(Some(&code)).is_unknown() || code == UNKNOWN_CODE {
                continue;
            }
            let (key, created) = dims
                .get_or_create_currency(&coded_payload(&code, &HashMap::new()))
                .await?;
            index.insert_currency(&code, key);
            if created {
                summary.dimensions_created += 1;
            }
        }

        Ok(())
    }

    /// Ensures the reserved aggregate customer, feed products, USD, and
    /// month-anchor time rows exist for the JSON stage.
    async fn resolve_monthly_dimensions(
        dims: &DimensionRepository,
        index: &mut ResolvedDimensions,
        masters: &MasterData,
        rows: &[MonthlySales],
        summary: &mut RunSummary,
    ) -> EtlResult<()> {
        if !index.contains_customer(AGGREGATE_CUSTOMER_CODE) {
            let (key, created) = dims
                .get_or_create_customer(&aggregate_customer(), CountryKey::UNKNOWN)
                .await?;
            index.insert_customer(AGGREGATE_CUSTOMER_CODE, key);
            if created {
                summary.dimensions_created += 1;
            }
        }

        if index.currency_or_unknown(Some(USD_CODE)).is_unknown() {
            let (key, created) = dims
                .get_or_create_currency(&coded_payload(USD_CODE, &HashMap::new()))
                .await?;
            index.insert_currency(USD_CODE, key);
            if created {
                summary.dimensions_created += 1;
            }
        }

        for code in collect(rows.iter().map(|r| normalize_code(&r.item_code))) {
            if code.is_empty() || index.product(&code).is_some() {
                continue;
            }
            let (key, created) = dims.get_or_create_product(&product_payload(&code, masters)).await?;
            index.insert_product(&code, key);
            if created {
                summary.dimensions_created += 1;
            }
        }

        for (year, month) in collect(rows.iter().map(|r| (r.year, r.month))) {
            if let Some(day) = CalendarDay::first_of_month(year, month) {
                dims.ensure_time_day(&day).await?;
            }
        }

        Ok(())
    }

    async fn resolve_country(
        dims: &DimensionRepository,
        index: &mut ResolvedDimensions,
        masters: &MasterData,
        iso2: Option<&str>,
        summary: &mut RunSummary,
    ) -> EtlResult<CountryKey> {
        let Some(iso2) = iso2.map(normalize_code).filter(|c| !c.is_empty()) else {
            return Ok(CountryKey::UNKNOWN);
        };
        if iso2 == UNKNOWN_CODE {
            return Ok(CountryKey::UNKNOWN);
        }

        let existing = index.country_or_unknown(Some(&iso2));
        if !existing.is_unknown() {
            return Ok(existing);
        }

        let (key, created) = dims
            .get_or_create_country(&coded_payload(&iso2, &masters.countries))
            .await?;
        index.insert_country(&iso2, key);
        if created {
            summary.dimensions_created += 1;
        }
        Ok(key)
    }
}

/// Month watermark key, zero-padded so lexical order matches calendar order.
fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// Distinct values in sorted order, so resolution is deterministic.
fn collect<T: Ord>(items: impl Iterator<Item = T>) -> BTreeSet<T> {
    items.collect()
}
