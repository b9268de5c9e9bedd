// src/config.rs
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use crate::command::split_command;
use crate::merge::MergePlan;
use crate::pipeline::CandidateFilter;
use crate::refresh::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrichStrategy {
    /// Read a file inside each running job.
    Remote,
    /// Read `<path>/<job>.json` on this machine.
    LocalFile,
    /// No enrichment.
    #[value(name = "none")]
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Plain,
    Markdown,
    /// Full-screen view redrawn in place (needs --loop).
    Live,
}

impl OutputFormat {
    /// Whether output owns the whole terminal (alternate screen, hidden cursor).
    pub fn takes_over_terminal(self) -> bool {
        self == OutputFormat::Live
    }
}

/// Augmented job listing: the cluster's job table plus per-job metadata.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "rlist", version, about, long_about = None)]
pub struct Cli {
    /// Command that prints the job table.
    #[arg(long, env = "RLIST_LIST_COMMAND", default_value = "runai list")]
    pub list_command: String,

    /// Lines printed above the table header.
    #[arg(long, env = "RLIST_SKIP_LINES", default_value_t = 1)]
    pub skip_lines: usize,

    /// Columns to hide (comma separated or repeated; pass '' to keep all).
    #[arg(
        long,
        env = "RLIST_DROP",
        value_delimiter = ',',
        default_values = ["IMAGE", "TYPE", "PROJECT", "USER", "PODs Running (Pending)"]
    )]
    pub drop: Vec<String>,

    /// Rename a column, OLD=NEW (comma separated or repeated).
    #[arg(long, env = "RLIST_RENAME", value_delimiter = ',')]
    pub rename: Vec<String>,

    /// Column holding the job name.
    #[arg(long, env = "RLIST_NAME_COLUMN", default_value = "NAME")]
    pub name_column: String,

    /// Column holding the job status.
    #[arg(long, env = "RLIST_STATUS_COLUMN", default_value = "STATUS")]
    pub status_column: String,

    /// Only jobs in this status are enriched ('' for all).
    #[arg(long, env = "RLIST_ENRICH_STATUS", default_value = "Running")]
    pub enrich_status: String,

    /// Where per-job metadata comes from.
    #[arg(short, long, env = "RLIST_ENRICH", value_enum, default_value_t = EnrichStrategy::Disabled)]
    pub enrich: EnrichStrategy,

    /// Metadata file inside each job (remote) or directory of <job>.json files (local-file).
    #[arg(short = 'f', long, env = "RLIST_PATH")]
    pub path: Option<String>,

    /// Command that prints a file from a job; {entity} and {path} are substituted.
    #[arg(long, env = "RLIST_EXEC_COMMAND", default_value = "runai exec {entity} cat {path}")]
    pub exec_command: String,

    /// Upper bound on concurrent remote queries.
    #[arg(long, env = "RLIST_MAX_PARALLEL", default_value_t = 10)]
    pub max_parallel: usize,

    /// Refresh every N seconds instead of printing once.
    #[arg(short, long = "loop", env = "RLIST_LOOP")]
    pub loop_secs: Option<u64>,

    /// How the table is printed.
    #[arg(long, env = "RLIST_FORMAT", value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,
}

/// Where enrichment comes from, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentConfig {
    Remote {
        path: String,
        exec_argv: Vec<String>,
        max_parallel: usize,
    },
    LocalFile {
        base: PathBuf,
    },
    Disabled,
}

/// Validated settings the dashboard runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub list_argv: Vec<String>,
    pub preamble_lines: usize,
    pub plan: MergePlan,
    pub filter: CandidateFilter,
    pub enrichment: EnrichmentConfig,
    pub mode: Mode,
    pub format: OutputFormat,
    /// `name : value` pairs echoed in the banner and every frame.
    pub summary: Vec<(String, String)>,
}

fn parse_rename(entry: &str) -> Result<(String, String)> {
    match entry.split_once('=') {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        _ => bail!("--rename expects OLD=NEW, got `{}`", entry),
    }
}

impl Cli {
    /// Check everything that would make running pointless, before any refresh.
    pub fn validate(&self) -> Result<Settings> {
        let list_argv = split_command(&self.list_command).context("--list-command")?;

        let rename_map = self
            .rename
            .iter()
            .filter(|r| !r.trim().is_empty())
            .map(|r| parse_rename(r))
            .collect::<Result<BTreeMap<_, _>>>()?;

        if self.max_parallel == 0 {
            bail!("--max-parallel must be at least 1");
        }

        let mode = match self.loop_secs {
            Some(0) => bail!("--loop must be a positive number of seconds"),
            Some(secs) => Mode::Periodic(Duration::from_secs(secs)),
            None => Mode::SingleShot,
        };
        if self.format == OutputFormat::Live && mode == Mode::SingleShot {
            bail!("--format live needs --loop");
        }

        let path = self.path.as_deref().filter(|p| !p.trim().is_empty());
        let enrichment = match (self.enrich, path) {
            (EnrichStrategy::Disabled, _) => EnrichmentConfig::Disabled,
            (_, None) => bail!("--enrich {:?} needs --path", self.enrich),
            (EnrichStrategy::Remote, Some(path)) => {
                let exec_argv = split_command(&self.exec_command).context("--exec-command")?;
                if !exec_argv.iter().any(|a| a.contains("{entity}")) {
                    bail!("--exec-command must contain {{entity}}");
                }
                EnrichmentConfig::Remote {
                    path: path.to_string(),
                    exec_argv,
                    max_parallel: self.max_parallel,
                }
            }
            (EnrichStrategy::LocalFile, Some(path)) => EnrichmentConfig::LocalFile {
                base: PathBuf::from(path),
            },
        };

        Ok(Settings {
            list_argv,
            preamble_lines: self.skip_lines,
            plan: MergePlan {
                drop_columns: self
                    .drop
                    .iter()
                    .filter(|d| !d.is_empty())
                    .cloned()
                    .collect(),
                rename_map,
                name_column: self.name_column.clone(),
            },
            filter: CandidateFilter {
                status_column: self.status_column.clone(),
                status: self.enrich_status.clone(),
            },
            enrichment,
            mode,
            format: self.format,
            summary: self.summary(),
        })
    }

    /// Every option with its effective value, in declaration order.
    pub fn summary(&self) -> Vec<(String, String)> {
        let Ok(Value::Object(fields)) = serde_json::to_value(self) else {
            return Vec::new();
        };
        fields
            .into_iter()
            .map(|(k, v)| {
                let shown = match v {
                    Value::Null => "-".to_string(),
                    Value::String(s) => s,
                    Value::Array(items) => items
                        .iter()
                        .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                        .collect::<Vec<_>>()
                        .join(","),
                    other => other.to_string(),
                };
                (k, shown)
            })
            .collect()
    }
}

impl Settings {
    /// The startup banner: aligned `name : value` lines.
    pub fn banner(&self) -> String {
        let width = self.summary.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut out = String::from("Running augmented job list with following arguments:\n");
        for (k, v) in &self.summary {
            out.push_str(&format!("  {:<width$} : {}\n", k, v, width = width));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["rlist"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = cli(&[]).validate().unwrap();
        assert_eq!(settings.list_argv, vec!["runai", "list"]);
        assert_eq!(settings.preamble_lines, 1);
        assert_eq!(settings.mode, Mode::SingleShot);
        assert_eq!(settings.enrichment, EnrichmentConfig::Disabled);
        assert_eq!(settings.format, OutputFormat::Plain);
        assert_eq!(settings.plan.name_column, "NAME");
        assert!(settings
            .plan
            .drop_columns
            .contains(&"PODs Running (Pending)".to_string()));
        assert_eq!(settings.filter.status, "Running");
    }

    #[test]
    fn test_remote_and_loop() {
        let settings = cli(&[
            "--enrich", "remote", "-f", "/root/vars.json", "--loop", "5", "--max-parallel", "2",
            "--rename", "GPUs Allocated (Requested)=GPU,NODE=HOST", "--drop", "",
        ])
        .validate()
        .unwrap();

        assert_eq!(settings.mode, Mode::Periodic(Duration::from_secs(5)));
        assert_eq!(
            settings.enrichment,
            EnrichmentConfig::Remote {
                path: "/root/vars.json".into(),
                exec_argv: ["runai", "exec", "{entity}", "cat", "{path}"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                max_parallel: 2,
            }
        );
        assert!(settings.plan.drop_columns.is_empty());
        assert_eq!(
            settings.plan.rename_map.get("GPUs Allocated (Requested)"),
            Some(&"GPU".to_string())
        );
        assert_eq!(settings.plan.rename_map.get("NODE"), Some(&"HOST".to_string()));
    }

    #[test]
    fn test_local_file() {
        let settings = cli(&["--enrich", "local-file", "--path", "/data/vars"])
            .validate()
            .unwrap();
        assert_eq!(
            settings.enrichment,
            EnrichmentConfig::LocalFile {
                base: PathBuf::from("/data/vars")
            }
        );
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(cli(&["--loop", "0"]).validate().is_err());
        assert!(cli(&["--max-parallel", "0"]).validate().is_err());
        assert!(cli(&["--enrich", "remote"]).validate().is_err());
        assert!(cli(&["--enrich", "local-file", "--path", " "]).validate().is_err());
        assert!(cli(&["--format", "live"]).validate().is_err());
        assert!(cli(&["--rename", "NAME"]).validate().is_err());
        assert!(cli(&["--rename", "=JOB"]).validate().is_err());
        assert!(cli(&["--list-command", ""]).validate().is_err());
        assert!(cli(&["--enrich", "remote", "-f", "/x", "--exec-command", "cat {path}"])
            .validate()
            .is_err());
        assert!(Cli::try_parse_from(["rlist", "--enrich", "bogus"]).is_err());
    }

    #[test]
    fn test_only_live_takes_over_terminal() {
        assert!(OutputFormat::Live.takes_over_terminal());
        assert!(!OutputFormat::Plain.takes_over_terminal());
        assert!(!OutputFormat::Markdown.takes_over_terminal());
    }

    #[test]
    fn test_summary_and_banner() {
        let c = cli(&["--loop", "3", "--format", "live"]);
        let summary = c.summary();
        let get = |k: &str| {
            summary
                .iter()
                .find(|(name, _)| name == k)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("loop_secs").as_deref(), Some("3"));
        assert_eq!(get("format").as_deref(), Some("live"));
        assert_eq!(get("enrich").as_deref(), Some("none"));
        assert_eq!(get("path").as_deref(), Some("-"));
        assert_eq!(summary[0].0, "list_command");

        let banner = c.validate().unwrap().banner();
        assert!(banner.contains("  list_command  : runai list"));
    }
}
