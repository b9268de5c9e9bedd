// src/listing/mod.rs
pub mod columns;
pub mod source;

use std::collections::BTreeMap;
use tracing::warn;

pub use columns::{ColumnSpan, ColumnSpec};
pub use source::{CommandListing, ListingSource, StaticListing};

/// A decoded listing: column names plus one row of values per job.
///
/// Every row holds exactly `headers.len()` values, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// All values of `column`, top to bottom.
    pub fn column(&self, column: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Remove `name` from the header and every row. Returns false if absent.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.headers.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Rename columns in place, keeping position and data.
    ///
    /// Every header is looked up against the names as they were before the
    /// call, so swaps and chains resolve the same as one simultaneous rename.
    /// Returns the `from` names that matched no column.
    pub fn rename_columns<'m>(&mut self, renames: &'m BTreeMap<String, String>) -> Vec<&'m str> {
        let missing = renames
            .keys()
            .filter(|from| !self.has_column(from))
            .map(String::as_str)
            .collect();
        self.headers = self
            .headers
            .iter()
            .map(|h| renames.get(h).cloned().unwrap_or_else(|| h.clone()))
            .collect();
        missing
    }

    /// Append `name` with an empty value in every row, unless it already exists.
    /// Returns the column's index either way.
    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Push a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }
}

/// Decode a listing whose first non-blank line is the header.
pub fn decode(raw: &str) -> Table {
    decode_framed(raw, 0)
}

/// Decode a listing after skipping `preamble_lines` structural lines
/// (e.g. the banner `runai list` prints above its table).
///
/// Blank lines around the table are ignored. Malformed input never fails:
/// it yields a table with whatever header could be inferred and no rows.
pub fn decode_framed(raw: &str, preamble_lines: usize) -> Table {
    let lines: Vec<&str> = raw
        .lines()
        .skip(preamble_lines)
        .map(|l| l.trim_end_matches('\r'))
        .collect();

    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    let body = match (first, last) {
        (Some(first), Some(last)) => &lines[first..=last],
        _ => {
            warn!("listing has no header line");
            return Table::default();
        }
    };

    let spec = ColumnSpec::infer(body[0]);
    let mut table = Table::new(spec.names());
    for line in &body[1..] {
        table.push_row(spec.slice(line));
    }
    table
}
