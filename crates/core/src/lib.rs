pub mod error;
pub mod logging;

pub mod aggregate;
pub mod augment;
pub mod catalog;
pub mod config;
pub mod coverage;
pub mod decoder;
pub mod exclusion;
pub mod merge;
pub mod progress;
pub mod records;
pub mod report;

/// Numeric item identifier as used by the catalog and the map.
pub type ItemId = u32;

pub use aggregate::{CountSummary, OccurrenceAggregator, SortOrder};
pub use augment::{AugmentOptions, AugmentSummary, augment};
pub use catalog::{Catalog, CatalogEntry, load_coverage};
pub use config::AuditConfig;
pub use coverage::CoverageIndex;
pub use error::{AuditError, Result};
pub use exclusion::ExclusionFilter;
pub use merge::{MergeSummary, merge_files};
pub use records::{ItemRecord, RecordReader};
