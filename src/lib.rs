pub mod command;
pub mod config;
pub mod enrich;
pub mod listing;
pub mod merge;
pub mod pipeline;
pub mod refresh;
pub mod render;
pub mod shutdown;

use std::sync::Arc;

use config::{EnrichmentConfig, Settings};
use enrich::{EnrichmentSource, ExecReader, LocalFileLookup, NoEnrichment, RemoteQuery};
use listing::CommandListing;
use pipeline::Dashboard;

/// Pick the enrichment strategy once, at startup.
pub fn enrichment_source(config: &EnrichmentConfig) -> Box<dyn EnrichmentSource> {
    match config {
        EnrichmentConfig::Remote {
            path,
            exec_argv,
            max_parallel,
        } => Box::new(RemoteQuery::new(
            Arc::new(ExecReader::new(exec_argv.clone())),
            path.clone(),
            *max_parallel,
        )),
        EnrichmentConfig::LocalFile { base } => Box::new(LocalFileLookup::new(base.clone())),
        EnrichmentConfig::Disabled => Box::new(NoEnrichment),
    }
}

/// The dashboard pipeline described by `settings`, listing via the real command.
pub fn build_dashboard(settings: &Settings) -> Dashboard {
    Dashboard::new(
        Box::new(CommandListing::new(settings.list_argv.clone())),
        enrichment_source(&settings.enrichment),
        settings.plan.clone(),
        settings.filter.clone(),
        settings.preamble_lines,
    )
}
