//! Occurrence counting for identifiers missing from the catalog.

use crate::ItemId;
use crate::coverage::CoverageIndex;
use crate::error::Result;
use crate::progress::Progress;
use crate::records::ItemRecord;
use crate::report::ReportRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Example positions kept per identifier.
pub const MAX_EXAMPLE_POSITIONS: usize = 5;

/// Records between two progress ticks.
pub const DEFAULT_TICK_INTERVAL: u64 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Descending by count, ties ascending by id.
    #[default]
    Occurrences,
    IdAsc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "occurrences" => Ok(SortOrder::Occurrences),
            "id-asc" => Ok(SortOrder::IdAsc),
            other => Err(format!(
                "unknown sort order '{other}' (expected 'occurrences' or 'id-asc')"
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Occurrences => f.write_str("occurrences"),
            SortOrder::IdAsc => f.write_str("id-asc"),
        }
    }
}

impl SortOrder {
    /// Orders `(id, count)` pairs in place.
    pub fn sort_pairs(self, pairs: &mut [(ItemId, u64)]) {
        match self {
            SortOrder::Occurrences => {
                pairs.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
            }
            SortOrder::IdAsc => pairs.sort_unstable_by_key(|p| p.0),
        }
    }

    /// Orders report rows in place, by their `occurrences` and `id`.
    pub fn sort_rows(self, rows: &mut [ReportRow]) {
        match self {
            SortOrder::Occurrences => {
                rows.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then(a.id.cmp(&b.id)))
            }
            SortOrder::IdAsc => rows.sort_by_key(|r| r.id),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Occurrence {
    count: u64,
    positions: Vec<String>,
}

/// Result of one counting pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountSummary {
    /// Records consumed from the stream
    pub processed: u64,
    /// Records whose id the catalog does not cover
    pub uncovered: u64,
    /// Whether the sample limit cut the stream short
    pub truncated: bool,
}

#[derive(Debug, Default)]
pub struct OccurrenceAggregator {
    occurrences: HashMap<ItemId, Occurrence>,
    tick_interval: u64,
}

impl OccurrenceAggregator {
    pub fn new() -> Self {
        Self {
            occurrences: HashMap::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, interval: u64) -> Self {
        self.tick_interval = interval.max(1);
        self
    }

    /// Consumes `records`, counting every id `index` does not cover.
    ///
    /// With `sample_limit`, stops as soon as that many records were processed.
    /// A stream error aborts the pass; counts gathered so far are kept.
    pub fn count<I>(
        &mut self,
        records: I,
        index: &CoverageIndex,
        sample_limit: Option<u64>,
        progress: &mut dyn Progress,
    ) -> Result<CountSummary>
    where
        I: IntoIterator<Item = Result<ItemRecord>>,
    {
        let mut summary = CountSummary::default();
        if sample_limit == Some(0) {
            summary.truncated = true;
            return Ok(summary);
        }

        for record in records {
            let record = record?;
            summary.processed += 1;

            if !index.exists(record.id) {
                summary.uncovered += 1;
                let entry = self.occurrences.entry(record.id).or_default();
                entry.count += 1;
                if entry.positions.len() < MAX_EXAMPLE_POSITIONS {
                    entry.positions.push(record.position.to_string());
                }
            }

            if summary.processed % self.tick_interval == 0 {
                progress.tick(summary.processed);
            }
            if sample_limit.is_some_and(|limit| summary.processed >= limit) {
                summary.truncated = true;
                info!("Sample limit reached after {} records", summary.processed);
                break;
            }
        }

        progress.finish(summary.processed);
        Ok(summary)
    }

    /// Distinct uncovered identifiers seen so far.
    pub fn distinct(&self) -> usize {
        self.occurrences.len()
    }

    pub fn count_of(&self, id: ItemId) -> u64 {
        self.occurrences.get(&id).map(|o| o.count).unwrap_or(0)
    }

    /// Rows for every uncovered identifier, in `order`.
    ///
    /// Takes a snapshot of the ordering; the aggregator is left untouched.
    pub fn result(&self, order: SortOrder) -> impl Iterator<Item = ReportRow> + '_ {
        let mut pairs: Vec<(ItemId, u64)> = self
            .occurrences
            .iter()
            .map(|(id, occ)| (*id, occ.count))
            .collect();
        order.sort_pairs(&mut pairs);

        pairs.into_iter().map(move |(id, count)| {
            let positions = self
                .occurrences
                .get(&id)
                .map(|o| o.positions.join(","))
                .unwrap_or_default();
            ReportRow::uncovered(id, count, positions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use pretty_assertions::assert_eq;

    fn records(ids: &[ItemId]) -> Vec<Result<ItemRecord>> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Ok(ItemRecord::new(*id, i as i32, 0, 7)))
            .collect()
    }

    fn index_of(singles: &[ItemId]) -> CoverageIndex {
        let mut index = CoverageIndex::new();
        for s in singles {
            index.add_single(*s);
        }
        index.finalize();
        index
    }

    #[test]
    fn counts_only_uncovered_ids() {
        let mut agg = OccurrenceAggregator::new();
        let summary = agg
            .count(records(&[1, 2, 2, 3, 2]), &index_of(&[1]), None, &mut NoProgress)
            .unwrap();

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.uncovered, 4);
        assert!(!summary.truncated);
        assert_eq!(agg.count_of(1), 0);
        assert_eq!(agg.count_of(2), 3);
        assert_eq!(agg.count_of(3), 1);
    }

    #[test]
    fn occurrence_order_breaks_ties_by_id() {
        let mut agg = OccurrenceAggregator::new();
        agg.count(
            records(&[9, 4, 9, 4, 7, 1]),
            &CoverageIndex::new(),
            None,
            &mut NoProgress,
        )
        .unwrap();

        let ids: Vec<ItemId> = agg.result(SortOrder::Occurrences).map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 9, 1, 7]);

        let ids: Vec<ItemId> = agg.result(SortOrder::IdAsc).map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4, 7, 9]);
    }

    #[test]
    fn result_is_repeatable() {
        let mut agg = OccurrenceAggregator::new();
        agg.count(records(&[3, 3, 5]), &CoverageIndex::new(), None, &mut NoProgress)
            .unwrap();

        let first: Vec<ReportRow> = agg.result(SortOrder::Occurrences).collect();
        let second: Vec<ReportRow> = agg.result(SortOrder::Occurrences).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn positions_are_capped_in_first_seen_order() {
        let mut agg = OccurrenceAggregator::new();
        let stream: Vec<Result<ItemRecord>> =
            (0..100).map(|i| Ok(ItemRecord::new(42, i, i * 2, 7))).collect();
        agg.count(stream, &CoverageIndex::new(), None, &mut NoProgress)
            .unwrap();

        let row = agg.result(SortOrder::Occurrences).next().unwrap();
        assert_eq!(row.occurrences, 100);
        assert_eq!(row.example_positions, "0:0:7,1:2:7,2:4:7,3:6:7,4:8:7");
    }

    #[test]
    fn sample_limit_matches_prefix_counts() {
        let ids = [5, 6, 5, 7, 5, 6, 8, 8, 8, 8];
        let limit = 6;

        let mut sampled = OccurrenceAggregator::new();
        let summary = sampled
            .count(records(&ids), &CoverageIndex::new(), Some(limit), &mut NoProgress)
            .unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.processed, limit);

        let mut prefix = OccurrenceAggregator::new();
        prefix
            .count(
                records(&ids[..limit as usize]),
                &CoverageIndex::new(),
                None,
                &mut NoProgress,
            )
            .unwrap();

        let a: Vec<ReportRow> = sampled.result(SortOrder::IdAsc).collect();
        let b: Vec<ReportRow> = prefix.result(SortOrder::IdAsc).collect();
        assert_eq!(a, b);
        assert_eq!(sampled.count_of(8), 0);
    }

    #[test]
    fn ticks_fire_on_interval() {
        let mut ticks = Vec::new();
        let mut agg = OccurrenceAggregator::new().with_tick_interval(3);
        let mut observer = |n: u64| ticks.push(n);
        agg.count(
            records(&[1, 2, 3, 4, 5, 6, 7]),
            &CoverageIndex::new(),
            None,
            &mut observer,
        )
        .unwrap();
        assert_eq!(ticks, vec![3, 6]);
    }

    #[test]
    fn stream_error_propagates() {
        let stream = vec![
            Ok(ItemRecord::new(1, 0, 0, 0)),
            Err(crate::error::AuditError::Decoder("boom".into())),
            Ok(ItemRecord::new(2, 0, 0, 0)),
        ];
        let mut agg = OccurrenceAggregator::new();
        assert!(
            agg.count(stream, &CoverageIndex::new(), None, &mut NoProgress)
                .is_err()
        );
        assert_eq!(agg.count_of(1), 1);
        assert_eq!(agg.count_of(2), 0);
    }
}
