use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error in {}: {message}", path.display())]
    Xml { path: PathBuf, message: String },
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Spreadsheet error in {}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },
    #[error("Spreadsheet write error for {}: {source}", path.display())]
    SpreadsheetWrite {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("Catalog not found: {}", .0.display())]
    CatalogNotFound(PathBuf),
    #[error("Malformed catalog {}: {reason}", path.display())]
    MalformedCatalog { path: PathBuf, reason: String },
    #[error("Report not found: {}", .0.display())]
    ReportNotFound(PathBuf),
    #[error("Unsupported report format for {} (expected .csv, .tsv, .txt, .xlsx, .xlsm, .xlsb, .xls or .ods)", .0.display())]
    UnsupportedReportFormat(PathBuf),
    #[error("Sheet {index} not found in {}", path.display())]
    MissingSheet { path: PathBuf, index: usize },
    #[error("Backup of {} to {} failed: {source}", from.display(), to.display())]
    Backup {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Decoder error: {0}")]
    Decoder(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuditError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AuditError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn xml(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        AuditError::Xml {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed_catalog(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AuditError::MalformedCatalog {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
