//! Feeding operator-named report rows back into the catalog.
//!
//! One run: resolve the working file, index the catalog, scan the report for
//! candidates, sort and coalesce them into groups, then (unless dry-running)
//! back up and append the groups as a marked block.

use crate::ItemId;
use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{AuditError, Result};
use crate::progress::Progress;
use crate::report::{ReadOptions, ReportReader, ReportRow};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rows between two progress ticks while scanning the report.
pub const DEFAULT_ROW_TICK_INTERVAL: u64 = 1_000;

/// A report row accepted for the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: ItemId,
    pub article: String,
    pub name: String,
}

impl Candidate {
    pub fn new(id: ItemId, article: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            article: article.into(),
            name: name.into(),
        }
    }

    fn same_attributes(&self, other: &Candidate) -> bool {
        self.article == other.article && self.name == other.name
    }
}

/// Sorts candidates by id and collapses runs of consecutive ids with equal
/// `(article, name)` into ranges. Duplicate ids keep their first occurrence.
pub fn group_candidates(mut candidates: Vec<Candidate>) -> Vec<CatalogEntry> {
    // Stable, so the first occurrence of a duplicate id survives dedup
    candidates.sort_by_key(|c| c.id);
    candidates.dedup_by_key(|c| c.id);

    let mut groups = Vec::new();
    let mut iter = candidates.into_iter().peekable();
    while let Some(first) = iter.next() {
        let mut last_id = first.id;
        while let Some(next) = iter.peek() {
            if last_id.checked_add(1) == Some(next.id) && next.same_attributes(&first) {
                last_id = next.id;
                iter.next();
            } else {
                break;
            }
        }

        let Candidate { id, article, name } = first;
        if last_id > id {
            groups.push(CatalogEntry::Range {
                from: id,
                to: last_id,
                article,
                name,
            });
        } else {
            groups.push(CatalogEntry::Single { id, article, name });
        }
    }
    groups
}

#[derive(Debug, Clone)]
pub struct AugmentOptions {
    /// Write to this copy instead of editing the catalog in place
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub backup: bool,
    pub read: ReadOptions,
    pub tick_interval: u64,
}

impl Default for AugmentOptions {
    fn default() -> Self {
        Self {
            output: None,
            dry_run: false,
            backup: true,
            read: ReadOptions::default(),
            tick_interval: DEFAULT_ROW_TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AugmentSummary {
    pub rows_scanned: u64,
    /// Rows without a positive id or a name
    pub rows_invalid: u64,
    /// Rows whose id the catalog already covers
    pub rows_covered: u64,
    /// Rows repeating an id seen earlier in the report
    pub rows_duplicate: u64,
    pub candidates: usize,
    pub groups: usize,
    pub ranges: usize,
    pub singles: usize,
    pub appended: usize,
    /// Identifiers covered by the appended entries
    pub ids_appended: u64,
    pub working_file: PathBuf,
    pub backup: Option<PathBuf>,
    pub dry_run: bool,
}

/// `<path>.bak.<YYYYMMDD_HHMMSS>`
pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".bak.{stamp}"));
    PathBuf::from(name)
}

fn backup_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Whether both paths resolve to one existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copies the catalog aside before it is mutated.
fn write_backup(path: &Path) -> Result<PathBuf> {
    let target = backup_path(path, &backup_stamp());
    fs::copy(path, &target).map_err(|source| AuditError::Backup {
        from: path.to_path_buf(),
        to: target.clone(),
        source,
    })?;
    info!("Backed up {} to {}", path.display(), target.display());
    Ok(target)
}

/// Scans `report` for rows missing from `catalog` and appends them.
pub fn augment(
    catalog: &Path,
    report: &Path,
    options: &AugmentOptions,
    progress: &mut dyn Progress,
) -> Result<AugmentSummary> {
    if !catalog.is_file() {
        return Err(AuditError::CatalogNotFound(catalog.to_path_buf()));
    }

    // A dry run never creates the output copy
    let working = match (&options.output, options.dry_run) {
        (Some(output), false) if same_file(catalog, output) => {
            info!(
                "Output {} is the catalog itself, editing in place",
                output.display()
            );
            catalog.to_path_buf()
        }
        (Some(output), false) => {
            fs::copy(catalog, output).map_err(|e| AuditError::io(output, e))?;
            info!("Working on copy {}", output.display());
            output.clone()
        }
        _ => catalog.to_path_buf(),
    };

    let mut document = Catalog::load(&working)?;
    let index = document.coverage();

    let mut summary = AugmentSummary {
        working_file: working.clone(),
        dry_run: options.dry_run,
        ..Default::default()
    };

    let interval = options.tick_interval.max(1);
    let mut candidates = Vec::new();
    for row in ReportReader::open(report, &options.read)? {
        let cells = row?;
        summary.rows_scanned += 1;
        if summary.rows_scanned % interval == 0 {
            progress.tick(summary.rows_scanned);
        }

        let Some(row) = ReportRow::from_cells(&cells).filter(ReportRow::is_candidate) else {
            summary.rows_invalid += 1;
            continue;
        };
        if index.exists(row.id) {
            summary.rows_covered += 1;
            continue;
        }
        candidates.push(Candidate::new(row.id, row.article, row.name));
    }
    progress.finish(summary.rows_scanned);

    let unique = {
        let mut ids: Vec<ItemId> = candidates.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    };
    summary.rows_duplicate = (candidates.len() - unique) as u64;
    summary.candidates = unique;

    let mut groups = group_candidates(candidates);
    summary.groups = groups.len();
    summary.ranges = groups.iter().filter(|g| g.is_range()).count();
    summary.singles = summary.groups - summary.ranges;
    debug!(
        "{} candidates coalesced into {} groups",
        summary.candidates, summary.groups
    );

    if options.dry_run {
        info!("Dry run: catalog {} left untouched", working.display());
        return Ok(summary);
    }
    if groups.is_empty() {
        info!("Nothing to append to {}", working.display());
        return Ok(summary);
    }

    if options.backup {
        summary.backup = Some(write_backup(&working)?);
    }

    groups.sort_by_key(CatalogEntry::min_id);
    let label = report
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.display().to_string());
    summary.appended = document.append_entries(&groups, &label);
    summary.ids_appended = groups.iter().map(CatalogEntry::span).sum();
    document.save()?;

    info!(
        "Appended {} entries ({} ranges, {} singles) covering {} ids to {}",
        summary.appended,
        summary.ranges,
        summary.singles,
        summary.ids_appended,
        working.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn groups_consecutive_runs() {
        let groups = group_candidates(vec![
            Candidate::new(20, "", "b"),
            Candidate::new(11, "", "a"),
            Candidate::new(10, "", "a"),
            Candidate::new(12, "", "a"),
        ]);
        assert_eq!(
            groups,
            vec![
                CatalogEntry::Range {
                    from: 10,
                    to: 12,
                    article: String::new(),
                    name: "a".into()
                },
                CatalogEntry::Single {
                    id: 20,
                    article: String::new(),
                    name: "b".into()
                },
            ]
        );
    }

    #[test]
    fn attribute_change_or_gap_breaks_run() {
        let groups = group_candidates(vec![
            Candidate::new(1, "a", "torch"),
            Candidate::new(2, "an", "torch"),
            Candidate::new(3, "an", "torch"),
            Candidate::new(5, "an", "torch"),
            Candidate::new(6, "an", "lamp"),
        ]);
        let shape: Vec<(ItemId, bool)> = groups.iter().map(|g| (g.min_id(), g.is_range())).collect();
        assert_eq!(shape, vec![(1, false), (2, true), (5, false), (6, false)]);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let groups = group_candidates(vec![
            Candidate::new(4, "", "first"),
            Candidate::new(4, "", "second"),
            Candidate::new(5, "", "first"),
        ]);
        assert_eq!(
            groups,
            vec![CatalogEntry::Range {
                from: 4,
                to: 5,
                article: String::new(),
                name: "first".into()
            }]
        );
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(group_candidates(Vec::new()).is_empty());
    }

    #[test]
    fn backup_name_has_stamp_suffix() {
        assert_eq!(
            backup_path(Path::new("/data/items.xml"), "20240101_120000"),
            PathBuf::from("/data/items.xml.bak.20240101_120000")
        );
    }
}
