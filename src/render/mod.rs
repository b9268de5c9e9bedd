// src/render/mod.rs
pub mod screen;

use anyhow::Result;
use chrono::{DateTime, Local};
use std::io::Write;

use crate::listing::Table;

pub use screen::{install_panic_restore, LiveScreen};

/// How a table is laid out as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Plain,
    Markdown,
}

/// Everything shown for one refresh.
#[derive(Debug, Clone)]
pub struct Frame {
    pub taken_at: DateTime<Local>,
    /// Active settings, shown under the title.
    pub settings: Vec<(String, String)>,
    /// The table, or the reason this refresh failed.
    pub outcome: Result<Table, String>,
}

impl Frame {
    pub fn new(settings: Vec<(String, String)>, outcome: Result<Table, String>) -> Self {
        Self {
            taken_at: Local::now(),
            settings,
            outcome,
        }
    }

    pub fn title(&self) -> String {
        format!(
            "improved job list. Last update: {}",
            self.taken_at.format("%H:%M:%S%z %d/%m/%Y")
        )
    }

    /// Title, settings, then the table (or error), one entry per line.
    pub fn lines(&self, layout: Layout) -> Vec<String> {
        let mut lines = vec![self.title()];
        if !self.settings.is_empty() {
            lines.push(
                self.settings
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("  "),
            );
        }
        lines.push(String::new());
        match &self.outcome {
            Ok(table) => {
                let body = match layout {
                    Layout::Plain => format_plain(table),
                    Layout::Markdown => format_markdown(table),
                };
                lines.extend(body.lines().map(str::to_string));
            }
            Err(msg) => lines.push(format!("error: {}", msg)),
        }
        lines
    }
}

/// Receives one frame per refresh.
pub trait Renderer {
    fn render(&mut self, frame: &Frame) -> Result<()>;
}

/// Prints frames one after another to a writer (stdout in practice).
pub struct TextRenderer<W: Write> {
    out: W,
    layout: Layout,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, layout: Layout) -> Self {
        Self { out, layout }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        for line in frame.lines(self.layout) {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

fn column_widths(table: &Table) -> Vec<usize> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            table
                .rows
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect()
}

/// Left-aligned columns separated by two spaces, so the output decodes back
/// into the same table.
pub fn format_plain(table: &Table) -> String {
    if table.headers.is_empty() {
        return "(no columns)".to_string();
    }
    let widths = column_widths(table);
    let fmt_row = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{:<w$}", c, w = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![fmt_row(&table.headers)];
    out.extend(table.rows.iter().map(|r| fmt_row(r)));
    out.join("\n")
}

/// GitHub-flavoured markdown table.
pub fn format_markdown(table: &Table) -> String {
    if table.headers.is_empty() {
        return "(no columns)".to_string();
    }
    let fmt_row = |cells: &[String]| {
        let cells: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut out = vec![
        fmt_row(&table.headers),
        format!("|{}|", vec!["---"; table.headers.len()].join("|")),
    ];
    out.extend(table.rows.iter().map(|r| fmt_row(r)));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::decode;

    fn sample() -> Table {
        let mut t = Table::new(vec!["NAME".into(), "GPUs (Req)".into(), "LR".into()]);
        t.push_row(vec!["train-long-name".into(), "2 (2)".into(), "0.1".into()]);
        t.push_row(vec!["b".into(), "- (1)".into(), "1e-4".into()]);
        t
    }

    #[test]
    fn test_plain_decodes_back() {
        let table = sample();
        let text = format_plain(&table);
        assert_eq!(decode(&text), table);
    }

    #[test]
    fn test_plain_layout() {
        let text = format_plain(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "NAME             GPUs (Req)  LR");
        assert_eq!(lines[2], "b                - (1)       1e-4");
    }

    #[test]
    fn test_markdown() {
        let mut t = Table::new(vec!["NAME".into(), "NOTE".into()]);
        t.push_row(vec!["a".into(), "x|y".into()]);
        assert_eq!(
            format_markdown(&t),
            "| NAME | NOTE |\n|---|---|\n| a | x\\|y |"
        );
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(format_plain(&Table::default()), "(no columns)");
        let header_only = Table::new(vec!["NAME".into()]);
        assert_eq!(format_plain(&header_only), "NAME");
        assert_eq!(format_markdown(&header_only), "| NAME |\n|---|");
    }

    #[test]
    fn test_frame_lines_and_error() {
        let settings = vec![("loop".to_string(), "5".to_string())];
        let ok = Frame::new(settings.clone(), Ok(sample()));
        let lines = ok.lines(Layout::Plain);
        assert!(lines[0].starts_with("improved job list. Last update: "));
        assert_eq!(lines[1], "loop=5");
        assert_eq!(lines[2], "");
        assert!(lines[3].starts_with("NAME"));

        let failed = Frame::new(settings, Err("runai: not logged in".into()));
        let lines = failed.lines(Layout::Markdown);
        assert_eq!(lines.last().unwrap(), "error: runai: not logged in");
    }

    #[test]
    fn test_text_renderer_writes_frames() {
        let mut renderer = TextRenderer::new(Vec::new(), Layout::Plain);
        let frame = Frame::new(Vec::new(), Ok(sample()));
        renderer.render(&frame).unwrap();
        renderer.render(&frame).unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out.matches("improved job list").count(), 2);
        assert!(out.contains("train-long-name"));
    }
}
