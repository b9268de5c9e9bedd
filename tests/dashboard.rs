use anyhow::{anyhow, bail, Result};
use rlist::{
    config::Cli,
    enrich::{LocalFileLookup, RemoteQuery, RemoteReader},
    listing::StaticListing,
    merge::MergePlan,
    pipeline::{CandidateFilter, Dashboard, Pipeline},
    refresh::{Mode, Scheduler},
    render::{Layout, TextRenderer},
};
use clap::Parser;
use futures::future::{BoxFuture, FutureExt};
use std::{collections::BTreeMap, fs, sync::Arc};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

const RUNAI_LIST: &str = "Showing jobs for project team-a\n\
NAME     STATUS     AGE  NODE     IMAGE         TYPE   PROJECT  USER   GPUs Allocated (Requested)  PODs Running (Pending)\n\
train-1  Running    2d   node-07  repo/img:1.0  Train  team-a   alice  2 (2)                       1 (0)\n\
train-2  Running    1h   node-03  repo/img:1.0  Train  team-a   alice  1 (1)                       1 (0)\n\
sweep-9  Pending    5m            repo/img:1.1  Train  team-a   bob    - (1)                       0 (1)\n\
broken   Running    9m   node-01  repo/img:1.1  Train  team-a   bob    1 (1)                       1 (0)\n";

/// Per-job answers keyed by name; unknown jobs have vanished.
struct Cluster;

impl RemoteReader for Cluster {
    fn read(&self, entity: &str, _path: &str) -> Result<Vec<u8>> {
        match entity {
            "train-1" => Ok(br#"{"LR": 0.001, "BATCH": 64}"#.to_vec()),
            "train-2" => Ok(br#"{"LR": "3e-4", "SEED": 7}"#.to_vec()),
            "broken" => Ok(b"cat: /vars.json: No such file or directory".to_vec()),
            other => bail!("job {} not found", other),
        }
    }
}

fn plan() -> MergePlan {
    let mut rename_map = BTreeMap::new();
    rename_map.insert("GPUs Allocated (Requested)".to_string(), "GPUs".to_string());
    MergePlan {
        drop_columns: ["IMAGE", "TYPE", "PROJECT", "USER", "PODs Running (Pending)"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rename_map,
        name_column: "NAME".into(),
    }
}

fn running() -> CandidateFilter {
    CandidateFilter {
        status_column: "STATUS".into(),
        status: "Running".into(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remote_enrichment_end_to_end() {
    let dashboard = Dashboard::new(
        Box::new(StaticListing::new(RUNAI_LIST)),
        Box::new(RemoteQuery::new(Arc::new(Cluster), "/vars.json", 2)),
        plan(),
        running(),
        1,
    );

    let table = dashboard.run().await.unwrap();

    assert_eq!(
        table.headers,
        vec!["NAME", "STATUS", "AGE", "NODE", "GPUs", "LR", "BATCH", "SEED"]
    );
    assert_eq!(
        table.rows[0],
        vec!["train-1", "Running", "2d", "node-07", "2 (2)", "0.001", "64", ""]
    );
    assert_eq!(
        table.rows[1],
        vec!["train-2", "Running", "1h", "node-03", "1 (1)", "3e-4", "", "7"]
    );
    // pending job never queried, broken job answered garbage
    assert_eq!(table.rows[2][5..], ["", "", ""]);
    assert_eq!(table.rows[3][5..], ["", "", ""]);
    assert_eq!(table.value(2, "NODE"), Some(""));
}

#[tokio::test]
async fn test_local_file_enrichment_end_to_end() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("train-2.json"), r#"{"OWNER": "alice", "NOTE": null}"#).unwrap();
    fs::write(dir.path().join("sweep-9.json"), r#"{"OWNER": "bob"}"#).unwrap();

    let dashboard = Dashboard::new(
        Box::new(StaticListing::new(RUNAI_LIST)),
        Box::new(LocalFileLookup::new(dir.path())),
        plan(),
        // every job, not just running ones
        CandidateFilter {
            status: String::new(),
            ..running()
        },
        1,
    );

    let table = dashboard.run().await.unwrap();
    assert_eq!(table.column("OWNER"), Some(vec!["", "alice", "bob", ""]));
    assert_eq!(table.column("NOTE"), Some(vec!["", "", "", ""]));
}

#[tokio::test]
async fn test_single_shot_markdown_render() {
    let cli = Cli::try_parse_from(["rlist", "--format", "markdown"]).unwrap();
    let settings = cli.validate().unwrap();

    let dashboard = Dashboard::new(
        Box::new(StaticListing::new(RUNAI_LIST)),
        rlist::enrichment_source(&settings.enrichment),
        settings.plan.clone(),
        settings.filter.clone(),
        settings.preamble_lines,
    );
    let mut renderer = TextRenderer::new(Vec::new(), Layout::Markdown);
    let mut scheduler = Scheduler::new(
        &dashboard,
        &mut renderer,
        settings.summary.clone(),
        CancellationToken::new(),
    );
    assert_eq!(scheduler.run(Mode::SingleShot).await.unwrap(), 1);

    let out = String::from_utf8(renderer.into_inner()).unwrap();
    assert!(out.contains("format=markdown"));
    assert!(out.contains("| NAME | STATUS | AGE | NODE | GPUs Allocated (Requested) |"));
    assert!(out.contains("| sweep-9 | Pending | 5m |  | - (1) |"));
}

#[tokio::test]
async fn test_failed_listing_renders_error_frame() {
    struct Down;
    impl rlist::listing::ListingSource for Down {
        fn fetch(&self) -> BoxFuture<'_, Result<String>> {
            async { Err(anyhow!("runai: not logged in")) }.boxed()
        }
    }

    let dashboard = Dashboard::new(
        Box::new(Down),
        Box::new(rlist::enrich::NoEnrichment),
        plan(),
        running(),
        1,
    );
    let mut renderer = TextRenderer::new(Vec::new(), Layout::Plain);
    let mut scheduler =
        Scheduler::new(&dashboard, &mut renderer, Vec::new(), CancellationToken::new());
    assert_eq!(scheduler.run(Mode::SingleShot).await.unwrap(), 1);

    let out = String::from_utf8(renderer.into_inner()).unwrap();
    assert!(out.contains("error: runai: not logged in"));
}
