//! End-of-run summary accumulation.
//!
//! Per-record rejections never fail the run; they accumulate here together
//! with load and reconciliation counts, and the whole summary is logged at
//! the end of the run. The exit status is decided by the orchestrator from
//! fatal errors, not from these counts.

use std::collections::BTreeMap;

use crate::normalize::Rejection;

/// Accumulated counts for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// FX rate rows applied to the time dimension.
    pub fx_rows_loaded: usize,
    /// Malformed FX rows skipped with a warning.
    pub fx_rows_skipped: usize,
    /// Facts upserted from the OLTP source.
    pub oltp_facts: usize,
    /// Facts upserted from the JSON aggregate feed.
    pub json_facts: usize,
    /// Dimension rows created on first sight this run.
    pub dimensions_created: usize,
    /// Facts whose local leg was derived by the reconciliation sweep.
    pub reconciled_local: u64,
    /// Facts whose USD leg was derived by the reconciliation sweep.
    pub reconciled_usd: u64,
    /// Facts still missing an amount leg because no rate is known for
    /// their date. A monitored gap, not an error.
    pub facts_awaiting_rate: u64,
    /// Every rejected record, in arrival order.
    pub rejections: Vec<Rejection>,
}

impl RunSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one rejected record.
    pub fn record_rejection(&mut self, rejection: Rejection) {
        tracing::warn!(
            source_doc_id = %rejection.source_doc_id,
            reason = rejection.reason.as_str(),
            "record rejected"
        );
        self.rejections.push(rejection);
    }

    /// Rejection counts grouped by reason.
    #[must_use]
    pub fn rejections_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for rejection in &self.rejections {
            *counts.entry(rejection.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Total facts upserted across sources.
    #[must_use]
    pub fn facts_loaded(&self) -> usize {
        self.oltp_facts + self.json_facts
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "facts loaded: {} (oltp {}, json {}); dimensions created: {}; \
             fx rows: {} loaded, {} skipped; reconciled: {} local, {} usd; \
             awaiting rate: {}; rejected: {}",
            self.facts_loaded(),
            self.oltp_facts,
            self.json_facts,
            self.dimensions_created,
            self.fx_rows_loaded,
            self.fx_rows_skipped,
            self.reconciled_local,
            self.reconciled_usd,
            self.facts_awaiting_rate,
            self.rejections.len(),
        )?;
        for (reason, count) in self.rejections_by_reason() {
            write!(f, "\n  {reason}: {count}")?;
        }
        Ok(())
    }
}
