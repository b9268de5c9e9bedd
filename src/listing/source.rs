use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::command::run_cmd;

/// Produces the raw text of one job listing.
pub trait ListingSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<String>>;
}

/// Runs the external listing command and returns its stdout.
///
/// A non-zero exit or anything on stderr fails the fetch.
pub struct CommandListing {
    argv: Vec<String>,
}

impl CommandListing {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl ListingSource for CommandListing {
    fn fetch(&self) -> BoxFuture<'_, Result<String>> {
        let argv = self.argv.clone();
        async move {
            debug!(command = %argv.join(" "), "running listing command");
            let out = tokio::task::spawn_blocking(move || run_cmd(&argv, true, false))
                .await
                .context("listing command task panicked")??;
            Ok(out)
        }
        .boxed()
    }
}

/// A fixed listing, handy for replaying captured output.
pub struct StaticListing {
    text: String,
}

impl StaticListing {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ListingSource for StaticListing {
    fn fetch(&self) -> BoxFuture<'_, Result<String>> {
        let text = self.text.clone();
        async move { Ok(text) }.boxed()
    }
}
