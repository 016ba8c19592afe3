//! Tabular report readers.
//!
//! Delimited text goes through `csv`, spreadsheets through `calamine`. Both
//! treat the first row as the header, lowercase and trim header names, and
//! skip rows whose cells are all blank.

use super::model::{CellValue, RowMap};
use crate::error::{AuditError, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Delimited(u8),
    Spreadsheet,
}

impl ReportFormat {
    /// Picks the format from the file extension. `delimiter` overrides the
    /// per-extension default for text formats.
    pub fn detect(path: &Path, delimiter: Option<u8>) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(ReportFormat::Delimited(delimiter.unwrap_or(b','))),
            "tsv" => Ok(ReportFormat::Delimited(delimiter.unwrap_or(b'\t'))),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(ReportFormat::Spreadsheet),
            _ => Err(AuditError::UnsupportedReportFormat(path.to_path_buf())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Zero-based sheet index for spreadsheets
    pub sheet: usize,
    /// Delimiter for text reports; `None` picks by extension
    pub delimiter: Option<u8>,
}

enum RowSource {
    Delimited(csv::StringRecordsIntoIter<File>),
    Sheet { range: Range<Data>, next: usize },
}

/// Lazy sequence of [`RowMap`]s from a report file.
pub struct ReportReader {
    path: PathBuf,
    headers: Vec<String>,
    source: RowSource,
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

impl ReportReader {
    pub fn open(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = ReportFormat::detect(&path, options.delimiter)?;
        if !path.is_file() {
            return Err(AuditError::ReportNotFound(path));
        }

        match format {
            ReportFormat::Delimited(delimiter) => Self::open_delimited(path, delimiter),
            ReportFormat::Spreadsheet => Self::open_sheet(path, options.sheet),
        }
    }

    fn open_delimited(path: PathBuf, delimiter: u8) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|source| AuditError::Csv {
                path: path.clone(),
                source,
            })?;
        let mut records = reader.into_records();

        let headers = match records.next() {
            Some(Ok(record)) => record.iter().map(normalize_header).collect(),
            Some(Err(source)) => return Err(AuditError::Csv { path, source }),
            None => Vec::new(),
        };

        Ok(Self {
            path,
            headers,
            source: RowSource::Delimited(records),
        })
    }

    fn open_sheet(path: PathBuf, sheet: usize) -> Result<Self> {
        let spreadsheet_err = |path: &Path, e: calamine::Error| AuditError::Spreadsheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut workbook = open_workbook_auto(&path).map_err(|e| spreadsheet_err(&path, e))?;
        let range = match workbook.worksheet_range_at(sheet) {
            Some(Ok(range)) => range,
            Some(Err(e)) => return Err(spreadsheet_err(&path, e)),
            None => return Err(AuditError::MissingSheet { path, index: sheet }),
        };

        let headers = (0..range.width())
            .map(|col| {
                range
                    .get((0, col))
                    .map(|d| normalize_header(&cell_from_data(d).as_text()))
                    .unwrap_or_default()
            })
            .collect();

        Ok(Self {
            path,
            headers,
            source: RowSource::Sheet { range, next: 1 },
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn build_row(&self, cells: impl Iterator<Item = CellValue>) -> Option<RowMap> {
        let mut row = RowMap::with_capacity(self.headers.len());
        let mut blank = true;
        for (header, cell) in self.headers.iter().zip(cells) {
            if header.is_empty() {
                continue;
            }
            blank &= cell.is_blank();
            row.insert(header.clone(), cell);
        }
        if blank { None } else { Some(row) }
    }
}

impl Iterator for ReportReader {
    type Item = Result<RowMap>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cells: Vec<CellValue> = match &mut self.source {
                RowSource::Delimited(records) => match records.next()? {
                    Ok(record) => record.iter().map(|s| CellValue::Text(s.to_string())).collect(),
                    Err(source) => {
                        return Some(Err(AuditError::Csv {
                            path: self.path.clone(),
                            source,
                        }));
                    }
                },
                RowSource::Sheet { range, next } => {
                    if *next >= range.height() {
                        return None;
                    }
                    let r = *next;
                    *next += 1;
                    (0..range.width())
                        .map(|c| range.get((r, c)).map(cell_from_data).unwrap_or(CellValue::Empty))
                        .collect()
                }
            };

            if let Some(row) = self.build_row(cells.into_iter()) {
                return Some(Ok(row));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn detects_formats() {
        assert_eq!(
            ReportFormat::detect(Path::new("a.CSV"), None).unwrap(),
            ReportFormat::Delimited(b',')
        );
        assert_eq!(
            ReportFormat::detect(Path::new("a.tsv"), None).unwrap(),
            ReportFormat::Delimited(b'\t')
        );
        assert_eq!(
            ReportFormat::detect(Path::new("a.csv"), Some(b';')).unwrap(),
            ReportFormat::Delimited(b';')
        );
        assert_eq!(
            ReportFormat::detect(Path::new("a.xlsx"), None).unwrap(),
            ReportFormat::Spreadsheet
        );
        assert!(matches!(
            ReportFormat::detect(Path::new("a.json"), None),
            Err(AuditError::UnsupportedReportFormat(_))
        ));
    }

    #[test]
    fn reads_csv_with_normalized_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "r.csv",
            " ID ,Occurrences,Name\n10,3,torch\n,,\n11,1,\"rope, long\"\n",
        );

        let reader = ReportReader::open(&path, &ReadOptions::default()).unwrap();
        assert_eq!(reader.headers(), &["id", "occurrences", "name"]);

        let rows: Vec<RowMap> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], CellValue::Text("10".into()));
        assert_eq!(rows[1]["name"], CellValue::Text("rope, long".into()));
    }

    #[test]
    fn reads_custom_delimiter_and_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "r.txt", "id;name;article\n5;shovel\n");

        let options = ReadOptions {
            delimiter: Some(b';'),
            ..Default::default()
        };
        let rows: Vec<RowMap> = ReportReader::open(&path, &options)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], CellValue::Text("shovel".into()));
        assert!(!rows[0].contains_key("article"));
    }

    #[test]
    fn empty_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "r.csv", "");
        assert_eq!(ReportReader::open(&path, &ReadOptions::default()).unwrap().count(), 0);
    }

    #[test]
    fn unsupported_extension_fails_before_io() {
        let err = ReportReader::open("/nowhere/report.pdf", &ReadOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, AuditError::UnsupportedReportFormat(_)));
    }

    #[test]
    fn unsupported_message_lists_every_readable_extension() {
        let message = AuditError::UnsupportedReportFormat(PathBuf::from("r.pdf")).to_string();
        for ext in ["csv", "tsv", "txt", "xlsx", "xlsm", "xlsb", "xls", "ods"] {
            assert!(ReportFormat::detect(Path::new(&format!("r.{ext}")), None).is_ok());
            let listed = [",", " ", ")"]
                .iter()
                .any(|end| message.contains(&format!(".{ext}{end}")));
            assert!(listed, "{ext} missing from: {message}");
        }
    }

    #[test]
    fn missing_report_is_reported() {
        let err = ReportReader::open("/nowhere/report.csv", &ReadOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, AuditError::ReportNotFound(_)));
    }
}
