use futures::future::{BoxFuture, FutureExt};
use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use super::{parse_bag, EnrichmentMapping, EnrichmentSource, MetadataBag};

/// Reads `<base>/<job>.json` side files written next to the cluster.
pub struct LocalFileLookup {
    base: PathBuf,
}

impl LocalFileLookup {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn path_for(&self, entity: &str) -> PathBuf {
        self.base.join(format!("{}.json", entity))
    }
}

/// `None` when the side file does not exist.
fn lookup_one(path: &Path, entity: &str) -> Option<MetadataBag> {
    match fs::read(path) {
        Ok(bytes) => Some(parse_bag(entity, &bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(entity, path = %path.display(), "no side file");
            None
        }
        Err(e) => {
            warn!(entity, path = %path.display(), error = %e, "unreadable side file");
            Some(MetadataBag::new())
        }
    }
}

impl EnrichmentSource for LocalFileLookup {
    fn enrich<'a>(&'a self, names: &'a [String]) -> BoxFuture<'a, EnrichmentMapping> {
        let jobs: Vec<(String, PathBuf)> = names
            .iter()
            .map(|n| (n.clone(), self.path_for(n)))
            .collect();
        async move {
            let found = tokio::task::spawn_blocking(move || {
                jobs.into_par_iter()
                    .filter_map(|(name, path)| lookup_one(&path, &name).map(|bag| (name, bag)))
                    .collect::<Vec<_>>()
            })
            .await;

            match found {
                Ok(entries) => entries.into_iter().collect(),
                Err(e) => {
                    warn!(error = %e, "side file lookup failed");
                    EnrichmentMapping::new()
                }
            }
        }
        .boxed()
    }
}
