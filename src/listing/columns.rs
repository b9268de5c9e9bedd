use once_cell::sync::Lazy;
use regex::Regex;

/// Two or more whitespace characters: the only thing that separates columns.
static COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("gap regex is valid"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// One column of the header, as byte offsets into the header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpan {
    pub name: String,
    pub start: usize,
    /// `None` for the last column, which runs to end of line.
    pub end: Option<usize>,
}

/// Column layout inferred from a header line.
///
/// Spans are contiguous: each column ends where the next one starts, so
/// whatever a data row carries inside the separator gap is attributed to the
/// column on its left (and then trimmed away).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSpec {
    pub columns: Vec<ColumnSpan>,
}

impl ColumnSpec {
    /// Infer column boundaries from `header`.
    ///
    /// A run of ≥2 whitespace characters closes the current column and opens
    /// the next one right after the run. Leading whitespace and a trailing run
    /// never produce a column.
    pub fn infer(header: &str) -> Self {
        let header = header.trim_end();
        let first = match header.find(|c: char| !c.is_whitespace()) {
            Some(i) => i,
            None => return Self::default(),
        };

        let mut starts = vec![first];
        for gap in COLUMN_GAP.find_iter(header) {
            if gap.start() > first {
                starts.push(gap.end());
            }
        }

        let columns = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied();
                let name = header[start..end.unwrap_or(header.len())].trim().to_string();
                ColumnSpan { name, start, end }
            })
            .collect();

        Self { columns }
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Slice `line` at these column offsets, one cleaned value per column.
    /// A line that stops short of a column yields empty strings from there on.
    pub fn slice(&self, line: &str) -> Vec<String> {
        self.columns
            .iter()
            .map(|col| {
                let start = floor_boundary(line, col.start);
                let end = floor_boundary(line, col.end.unwrap_or(line.len()));
                if start >= end {
                    String::new()
                } else {
                    collapse_whitespace(&line[start..end])
                }
            })
            .collect()
    }
}

/// Collapse every internal whitespace run to one space and trim both ends.
pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Clamp `idx` to `s.len()` and step back to a char boundary.
fn floor_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
