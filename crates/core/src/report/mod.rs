//! Tabular reports: the row model, readers and writers.

pub mod model;
pub mod reader;
pub mod writer;

pub use model::{COLUMNS, CellValue, IMAGE_COLUMN, ReportRow, RowMap};
pub use reader::{ReadOptions, ReportFormat, ReportReader};
pub use writer::{ExportOptions, ExportSummary, write_report};
