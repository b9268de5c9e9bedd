use anyhow::Result;
use clap::Parser;
use rlist::{
    build_dashboard,
    config::{Cli, OutputFormat, Settings},
    pipeline::Dashboard,
    refresh::Scheduler,
    render::{install_panic_restore, Layout, LiveScreen, Renderer, TextRenderer},
    shutdown::install_shutdown_handler,
};
use std::{env, io, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// How long exit waits for remote reads still running on the blocking pool.
const EXIT_GRACE: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;
    let res = rt.block_on(run(cli));
    rt.shutdown_timeout(EXIT_GRACE);
    res
}

async fn run(cli: Cli) -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    // stderr shares the terminal with a live screen, so keep it quiet there
    let fallback = if cli.format.takes_over_terminal() {
        "error".to_string()
    } else {
        env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string())
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    if cli.format.takes_over_terminal() {
        install_panic_restore();
    }

    // ─── 2) validate settings before anything runs ───────────────────
    let settings = match cli.validate() {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Err(e);
        }
    };
    println!("\n{}", settings.banner());

    // ─── 3) build the pipeline and run it ────────────────────────────
    let dashboard = build_dashboard(&settings);
    let cancel = install_shutdown_handler();

    match settings.format {
        OutputFormat::Live => {
            let mut screen = LiveScreen::stdout()?;
            drive(&dashboard, &mut screen, &settings, cancel).await?;
        }
        OutputFormat::Plain => {
            let mut out = TextRenderer::new(io::stdout(), Layout::Plain);
            drive(&dashboard, &mut out, &settings, cancel).await?;
        }
        OutputFormat::Markdown => {
            let mut out = TextRenderer::new(io::stdout(), Layout::Markdown);
            drive(&dashboard, &mut out, &settings, cancel).await?;
        }
    }

    Ok(())
}

async fn drive<R: Renderer>(
    dashboard: &Dashboard,
    renderer: &mut R,
    settings: &Settings,
    cancel: CancellationToken,
) -> Result<()> {
    let mut scheduler = Scheduler::new(dashboard, renderer, settings.summary.clone(), cancel);
    let iterations = scheduler.run(settings.mode).await?;
    info!(iterations, "done");
    Ok(())
}
