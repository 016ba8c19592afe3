//! Combining two report row sets by identifier.
//!
//! Conflicts on the same id prefer whichever side has a name, and the base
//! side when both (or neither) do.

use crate::ItemId;
use crate::aggregate::SortOrder;
use crate::error::Result;
use crate::report::{ReadOptions, ReportReader, ReportRow};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub base_rows: usize,
    pub other_rows: usize,
    /// Raw rows dropped for lacking a positive id
    pub dropped: usize,
    /// Ids present on both sides
    pub conflicts: usize,
    /// Conflicts resolved in favour of the other side
    pub taken_from_other: usize,
    pub output_rows: usize,
}

/// Merges normalized rows. Later duplicates within `base` replace earlier ones.
pub fn merge_rows<B, O>(base: B, other: O, order: SortOrder) -> (Vec<ReportRow>, MergeSummary)
where
    B: IntoIterator<Item = ReportRow>,
    O: IntoIterator<Item = ReportRow>,
{
    let mut summary = MergeSummary::default();
    let mut merged: HashMap<ItemId, ReportRow> = HashMap::new();

    for row in base {
        summary.base_rows += 1;
        merged.insert(row.id, row);
    }

    for row in other {
        summary.other_rows += 1;
        match merged.get_mut(&row.id) {
            Some(existing) => {
                summary.conflicts += 1;
                if !existing.has_name() && row.has_name() {
                    debug!("Taking named row for id {} from other report", row.id);
                    *existing = row;
                    summary.taken_from_other += 1;
                }
            }
            None => {
                merged.insert(row.id, row);
            }
        }
    }

    let mut rows: Vec<ReportRow> = merged.into_values().collect();
    order.sort_rows(&mut rows);
    summary.output_rows = rows.len();
    (rows, summary)
}

fn read_rows(path: &Path, options: &ReadOptions, dropped: &mut usize) -> Result<Vec<ReportRow>> {
    let mut rows = Vec::new();
    for cells in ReportReader::open(path, options)? {
        match ReportRow::from_cells(&cells?) {
            Some(row) => rows.push(row),
            None => *dropped += 1,
        }
    }
    Ok(rows)
}

/// Reads both report files and merges them.
pub fn merge_files(
    base: &Path,
    other: &Path,
    options: &ReadOptions,
    order: SortOrder,
) -> Result<(Vec<ReportRow>, MergeSummary)> {
    let mut dropped = 0;
    let base_rows = read_rows(base, options, &mut dropped)?;
    let other_rows = read_rows(other, options, &mut dropped)?;

    let (rows, mut summary) = merge_rows(base_rows, other_rows, order);
    summary.dropped = dropped;
    info!(
        "Merged {} base and {} other rows into {} ({} conflicts, {} taken from other, {} dropped)",
        summary.base_rows,
        summary.other_rows,
        summary.output_rows,
        summary.conflicts,
        summary.taken_from_other,
        summary.dropped
    );
    Ok((rows, summary))
}
