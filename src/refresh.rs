// src/refresh.rs
use anyhow::Result;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pipeline::Pipeline;
use crate::render::{Frame, Renderer};

/// Run once, or keep refreshing every `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SingleShot,
    Periodic(Duration),
}

/// How long to wait after an iteration that took `elapsed`.
///
/// `None` means start the next iteration right away: an overrun is absorbed,
/// never paid back by shortening later waits.
pub fn next_delay(period: Duration, elapsed: Duration) -> Option<Duration> {
    if elapsed < period {
        Some(period - elapsed)
    } else {
        None
    }
}

/// Drives pipeline → renderer until done or cancelled.
pub struct Scheduler<'a, P: Pipeline, R: Renderer> {
    pipeline: &'a P,
    renderer: &'a mut R,
    settings: Vec<(String, String)>,
    cancel: CancellationToken,
}

impl<'a, P: Pipeline, R: Renderer> Scheduler<'a, P, R> {
    pub fn new(
        pipeline: &'a P,
        renderer: &'a mut R,
        settings: Vec<(String, String)>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            renderer,
            settings,
            cancel,
        }
    }

    /// Returns the number of completed iterations.
    ///
    /// Pipeline failures become error frames; only a renderer that can no
    /// longer draw ends the loop with an error.
    pub async fn run(&mut self, mode: Mode) -> Result<u64> {
        let mut iterations = 0u64;
        match mode {
            Mode::SingleShot => {
                if self.iteration().await? {
                    iterations += 1;
                }
            }
            Mode::Periodic(period) => loop {
                let start = Instant::now();
                if !self.iteration().await? {
                    break;
                }
                iterations += 1;

                match next_delay(period, start.elapsed()) {
                    Some(wait) => {
                        debug!(wait = ?wait, "waiting for next refresh");
                        tokio::select! {
                            biased;
                            _ = self.cancel.cancelled() => break,
                            _ = tokio::time::sleep(wait) => {}
                        }
                    }
                    None => {
                        warn!(
                            elapsed = ?start.elapsed(),
                            period = ?period,
                            "refresh overran its period; starting next immediately"
                        );
                    }
                }
                if self.cancel.is_cancelled() {
                    break;
                }
            },
        }
        info!(iterations, "stopped");
        Ok(iterations)
    }

    /// One pipeline run plus render. `false` if cancelled before finishing.
    async fn iteration(&mut self) -> Result<bool> {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(false),
            res = self.pipeline.run() => res,
        };
        let outcome = outcome.map_err(|e| {
            error!(error = ?e, "refresh failed");
            format!("{:#}", e)
        });
        self.renderer
            .render(&Frame::new(self.settings.clone(), outcome))?;
        Ok(true)
    }
}
