// src/merge.rs
use std::collections::BTreeMap;
use tracing::debug;

use crate::enrich::{display_value, EnrichmentMapping};
use crate::listing::Table;

/// Column shaping applied to every decoded listing.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    pub drop_columns: Vec<String>,
    pub rename_map: BTreeMap<String, String>,
    /// Join key, named as it appears in the listing header (before renaming).
    pub name_column: String,
}

impl MergePlan {
    /// The join key's header after renaming.
    pub fn resolved_name_column(&self) -> &str {
        self.rename_map
            .get(&self.name_column)
            .map(String::as_str)
            .unwrap_or(&self.name_column)
    }
}

/// Drop and rename columns, then fold the enrichment into the table.
///
/// Every metadata key seen in any bag becomes a column of every row; rows
/// whose job has no value for it keep an empty string.
pub fn merge(mut table: Table, plan: &MergePlan, enrichment: &EnrichmentMapping) -> Table {
    for col in &plan.drop_columns {
        if !table.drop_column(col) {
            debug!(column = %col, "drop: column not present");
        }
    }
    for from in table.rename_columns(&plan.rename_map) {
        debug!(from = %from, "rename: column not present");
    }

    // the join key is never taken from a bag
    let name_column = plan.resolved_name_column();

    // pass 1: grow the column set
    for key in enrichment.keys() {
        if key == name_column {
            debug!(key = %key, "metadata key shadows the name column; ignored");
            continue;
        }
        table.add_column(&key);
    }

    // pass 2: write values
    let name_idx = match table.column_index(name_column) {
        Some(idx) => idx,
        None => {
            if !enrichment.is_empty() {
                debug!(column = %name_column, "name column missing; enrichment not applied");
            }
            return table;
        }
    };
    for (entity, bag) in enrichment.iter() {
        let targets: Vec<usize> = (0..table.rows.len())
            .filter(|&r| table.rows[r][name_idx] == entity)
            .collect();
        for (key, value) in bag {
            if key == name_column {
                continue;
            }
            let Some(col) = table.column_index(key) else {
                continue;
            };
            let text = display_value(value);
            for &r in &targets {
                table.rows[r][col] = text.clone();
            }
        }
    }
    table
}
