//! Report export to delimited text or XLSX.

use super::model::{COLUMNS, IMAGE_COLUMN, ReportRow};
use crate::ItemId;
use crate::error::{AuditError, Result};
use crate::exclusion::ExclusionFilter;
use rust_xlsxwriter::{Format, Image, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SHEET_NAME: &str = "unknown_items";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFormat {
    Delimited(u8),
    Xlsx,
}

#[derive(Debug, Clone)]
pub struct ExportOptions<'a> {
    pub delimiter: Option<u8>,
    /// Directory searched for `<id>.png`; enables the `image` column
    pub image_dir: Option<&'a Path>,
    pub exclusion: &'a ExclusionFilter,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub excluded: usize,
    pub images: usize,
}

/// Header row, with the image column in second place when requested.
pub fn header(with_image: bool) -> Vec<&'static str> {
    let mut cols = COLUMNS.to_vec();
    if with_image {
        cols.insert(1, IMAGE_COLUMN);
    }
    cols
}

fn export_format(path: &Path, delimiter: Option<u8>) -> Result<ExportFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => Ok(ExportFormat::Delimited(delimiter.unwrap_or(b','))),
        "tsv" => Ok(ExportFormat::Delimited(delimiter.unwrap_or(b'\t'))),
        "xlsx" => Ok(ExportFormat::Xlsx),
        _ => Err(AuditError::UnsupportedReportFormat(path.to_path_buf())),
    }
}

fn image_for(dir: Option<&Path>, id: ItemId) -> Option<PathBuf> {
    let candidate = dir?.join(format!("{id}.png"));
    candidate.is_file().then_some(candidate)
}

/// Writes `rows` to `path`, dropping excluded ids. Row order is kept.
pub fn write_report<I>(path: &Path, rows: I, options: &ExportOptions<'_>) -> Result<ExportSummary>
where
    I: IntoIterator<Item = ReportRow>,
{
    let format = export_format(path, options.delimiter)?;
    let mut excluded = 0;
    let kept = rows.into_iter().filter(|row| {
        if options.exclusion.is_excluded(row.id) {
            debug!("Excluding id {} from export", row.id);
            excluded += 1;
            return false;
        }
        true
    });

    let mut summary = match format {
        ExportFormat::Delimited(delimiter) => write_delimited(path, kept, delimiter, options)?,
        ExportFormat::Xlsx => write_xlsx(path, kept, options).map_err(|source| {
            AuditError::SpreadsheetWrite {
                path: path.to_path_buf(),
                source,
            }
        })?,
    };
    summary.excluded = excluded;

    info!(
        "Exported {} rows to {} ({} images)",
        summary.written,
        path.display(),
        summary.images
    );
    Ok(summary)
}

fn write_delimited(
    path: &Path,
    rows: impl Iterator<Item = ReportRow>,
    delimiter: u8,
    options: &ExportOptions<'_>,
) -> Result<ExportSummary> {
    let csv_err = |source: csv::Error| AuditError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(csv_err)?;

    let with_image = options.image_dir.is_some();
    writer.write_record(header(with_image)).map_err(csv_err)?;

    let mut summary = ExportSummary::default();
    for row in rows {
        let mut fields = row.fields().to_vec();
        if with_image {
            let image = image_for(options.image_dir, row.id);
            if image.is_some() {
                summary.images += 1;
            }
            let cell = image.map(|p| p.display().to_string()).unwrap_or_default();
            fields.insert(1, cell);
        }
        writer.write_record(&fields).map_err(csv_err)?;
        summary.written += 1;
    }
    writer.flush().map_err(|e| AuditError::io(path, e))?;
    Ok(summary)
}

fn write_xlsx(
    path: &Path,
    rows: impl Iterator<Item = ReportRow>,
    options: &ExportOptions<'_>,
) -> std::result::Result<ExportSummary, XlsxError> {
    let with_image = options.image_dir.is_some();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, name) in header(with_image).iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &bold)?;
    }

    let shift: u16 = if with_image { 1 } else { 0 };
    let mut summary = ExportSummary::default();
    for (i, row) in rows.enumerate() {
        let r = (i + 1) as u32;
        sheet.write_number(r, 0, row.id as f64)?;
        sheet.write_number(r, 1 + shift, row.occurrences as f64)?;

        for (offset, value) in row.fields().iter().enumerate().skip(2) {
            if !value.is_empty() {
                sheet.write_string(r, offset as u16 + shift, value)?;
            }
        }

        if let Some(png) = image_for(options.image_dir, row.id) {
            match Image::new(&png) {
                Ok(image) => {
                    sheet.insert_image_fit_to_cell(r, 1, &image, true)?;
                    summary.images += 1;
                }
                Err(e) => warn!("Skipping unreadable image {}: {e}", png.display()),
            }
        }
        summary.written += 1;
    }

    workbook.save(path)?;
    Ok(summary)
}
