use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use std::{sync::Arc, time::Instant};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

use super::{parse_bag, EnrichmentMapping, EnrichmentSource, MetadataBag};
use crate::command::run_cmd;

/// Blocking read of `path` inside the running job `entity`.
pub trait RemoteReader: Send + Sync + 'static {
    fn read(&self, entity: &str, path: &str) -> Result<Vec<u8>>;
}

/// Reads a file inside a job by running an exec command such as
/// `runai exec {entity} cat {path}`.
///
/// Exit status and stderr are ignored: a job that cannot be exec'd into
/// simply produces no (or unparsable) output.
pub struct ExecReader {
    template: Vec<String>,
}

impl ExecReader {
    pub fn new(template: Vec<String>) -> Self {
        Self { template }
    }

    /// The concrete argv for one job.
    pub fn argv(&self, entity: &str, path: &str) -> Vec<String> {
        self.template
            .iter()
            .map(|arg| arg.replace("{entity}", entity).replace("{path}", path))
            .collect()
    }
}

impl RemoteReader for ExecReader {
    fn read(&self, entity: &str, path: &str) -> Result<Vec<u8>> {
        let out = run_cmd(&self.argv(entity, path), false, true)?;
        Ok(out.into_bytes())
    }
}

/// Queries every job for its metadata file, a bounded number at a time.
pub struct RemoteQuery {
    reader: Arc<dyn RemoteReader>,
    path: String,
    max_parallel: usize,
}

impl RemoteQuery {
    pub fn new(reader: Arc<dyn RemoteReader>, path: impl Into<String>, max_parallel: usize) -> Self {
        Self {
            reader,
            path: path.into(),
            max_parallel,
        }
    }
}

/// Worker count: never more than configured, than cores, or than jobs.
pub fn pool_size(max_parallel: usize, entities: usize) -> usize {
    max_parallel.min(num_cpus::get()).min(entities).max(1)
}

impl EnrichmentSource for RemoteQuery {
    fn enrich<'a>(&'a self, names: &'a [String]) -> BoxFuture<'a, EnrichmentMapping> {
        async move {
            let mut mapping = EnrichmentMapping::new();
            if names.is_empty() {
                return mapping;
            }

            let workers = pool_size(self.max_parallel, names.len());
            let sem = Arc::new(Semaphore::new(workers));
            let start = Instant::now();
            debug!(jobs = names.len(), workers, "querying jobs");

            // dropping this future drops the set: no further job is
            // dispatched and queued reads are aborted; reads already running
            // finish on the blocking pool
            let mut queries = JoinSet::new();
            let mut dispatched = 0;
            for (idx, name) in names.iter().enumerate() {
                let Ok(permit) = Arc::clone(&sem).acquire_owned().await else {
                    warn!("query pool closed early");
                    break;
                };
                let reader = Arc::clone(&self.reader);
                let path = self.path.clone();
                let entity = name.clone();
                queries.spawn_blocking(move || {
                    let _permit = permit;
                    (idx, query_one(reader.as_ref(), &entity, &path))
                });
                dispatched += 1;
            }

            let mut bags: Vec<Option<MetadataBag>> = (0..dispatched).map(|_| None).collect();
            while let Some(joined) = queries.join_next().await {
                match joined {
                    Ok((idx, bag)) => bags[idx] = Some(bag),
                    Err(e) => warn!(error = %e, "query worker failed"),
                }
            }
            for (name, bag) in names.iter().zip(bags) {
                mapping.insert(name.clone(), bag.unwrap_or_default());
            }

            info!(
                jobs = mapping.len(),
                workers,
                elapsed = ?start.elapsed(),
                "queried jobs"
            );
            mapping
        }
        .boxed()
    }
}

fn query_one(reader: &dyn RemoteReader, entity: &str, path: &str) -> MetadataBag {
    match reader.read(entity, path) {
        Ok(bytes) => parse_bag(entity, &bytes),
        Err(e) => {
            warn!(entity, error = %e, "query failed");
            MetadataBag::new()
        }
    }
}
