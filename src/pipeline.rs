// src/pipeline.rs
use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::enrich::EnrichmentSource;
use crate::listing::{decode_framed, ListingSource, Table};
use crate::merge::{merge, MergePlan};

/// One full refresh: produce the table that gets rendered.
pub trait Pipeline: Send + Sync {
    fn run(&self) -> BoxFuture<'_, Result<Table>>;
}

/// Which rows are worth enriching.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    pub status_column: String,
    /// Empty selects every row.
    pub status: String,
}

impl CandidateFilter {
    /// Distinct job names (first occurrence order) whose status matches.
    pub fn select(&self, table: &Table, name_column: &str) -> Vec<String> {
        let Some(name_idx) = table.column_index(name_column) else {
            warn!(column = name_column, "name column not in listing");
            return Vec::new();
        };
        let status_idx = if self.status.is_empty() {
            None
        } else {
            match table.column_index(&self.status_column) {
                Some(idx) => Some(idx),
                None => {
                    warn!(column = %self.status_column, "status column not in listing");
                    return Vec::new();
                }
            }
        };

        let mut names: Vec<String> = Vec::new();
        for row in &table.rows {
            if let Some(idx) = status_idx {
                if row[idx] != self.status {
                    continue;
                }
            }
            let name = &row[name_idx];
            if !name.is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// list → decode → select → enrich → merge.
pub struct Dashboard {
    listing: Box<dyn ListingSource>,
    enrichment: Box<dyn EnrichmentSource>,
    plan: MergePlan,
    filter: CandidateFilter,
    preamble_lines: usize,
}

impl Dashboard {
    pub fn new(
        listing: Box<dyn ListingSource>,
        enrichment: Box<dyn EnrichmentSource>,
        plan: MergePlan,
        filter: CandidateFilter,
        preamble_lines: usize,
    ) -> Self {
        Self {
            listing,
            enrichment,
            plan,
            filter,
            preamble_lines,
        }
    }

    async fn refresh(&self) -> Result<Table> {
        let start = Instant::now();

        let raw = self.listing.fetch().await?;
        let table = decode_framed(&raw, self.preamble_lines);
        if table.headers.is_empty() {
            warn!("listing produced no columns");
        }
        debug!(rows = table.rows.len(), columns = table.headers.len(), "decoded listing");

        // candidates are picked before renaming, on the listing's own headers
        let candidates = self.filter.select(&table, &self.plan.name_column);
        let enrichment = self.enrichment.enrich(&candidates).await;

        let table = merge(table, &self.plan, &enrichment);
        info!(
            rows = table.rows.len(),
            enriched = enrichment.len(),
            elapsed = ?start.elapsed(),
            "refreshed"
        );
        Ok(table)
    }
}

impl Pipeline for Dashboard {
    fn run(&self) -> BoxFuture<'_, Result<Table>> {
        self.refresh()
            .instrument(tracing::info_span!("refresh"))
            .boxed()
    }
}
