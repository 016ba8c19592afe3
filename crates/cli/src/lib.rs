mod augment;
mod merge;
mod scan;
mod view;

use clap::{Args, Parser, Subcommand};
use itemaudit_core::aggregate::SortOrder;
use itemaudit_core::config::AuditConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "itemaudit",
    version,
    about = "Finds map items missing from an item catalog and feeds named ones back",
    long_about = "Itemaudit counts every item placed on a decoded map whose identifier the XML item \
                  catalog does not define, exports them as a report for review, and appends the \
                  rows an operator has named back into the catalog as single or ranged entries."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report map items the catalog does not cover
    #[command(
        long_about = "Builds a coverage index from the catalog, streams the item records of a map \
                      (decoding it first when --map is given) and writes every uncovered identifier \
                      with its occurrence count and up to five example positions."
    )]
    Scan(ScanArgs),
    /// Append named report rows to the catalog
    #[command(
        long_about = "Reads a reviewed report, keeps rows with a positive id and a name that the \
                      catalog does not cover yet, groups consecutive ids with equal attributes and \
                      appends them before the catalog's closing tag. A timestamped backup is written first."
    )]
    Augment(AugmentArgs),
    /// Merge two reports by identifier
    #[command(
        long_about = "Combines two reports keyed by id. On conflicts the base row wins unless only \
                      the other row carries a name."
    )]
    Merge(MergeArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Item catalog (XML)
    #[arg(long, value_name = "XML")]
    pub catalog: PathBuf,
    /// Binary map, decoded with the configured decoder
    #[arg(long, value_name = "FILE", conflicts_with = "records", required_unless_present = "records")]
    pub map: Option<PathBuf>,
    /// Already decoded record file (one JSON object per line)
    #[arg(long, value_name = "JSONL")]
    pub records: Option<PathBuf>,
    /// Report to write (.csv, .tsv, .txt or .xlsx)
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
    /// Stop after this many records
    #[arg(long, value_name = "N")]
    pub sample: Option<u64>,
    #[arg(long, default_value_t = SortOrder::Occurrences)]
    pub sort: SortOrder,
    /// Directory holding `<id>.png` images; adds an image column
    #[arg(long, value_name = "DIR")]
    pub images: Option<PathBuf>,
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Keep the decoded record file here instead of a temporary directory
    #[arg(long, value_name = "JSONL", requires = "map")]
    pub records_out: Option<PathBuf>,
    /// Rows to print after the scan
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub preview: usize,
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct AugmentArgs {
    #[arg(long, value_name = "XML")]
    pub catalog: PathBuf,
    /// Reviewed report (.csv, .tsv, .txt, .xlsx, .xlsm, .xlsb, .xls or .ods)
    #[arg(long, value_name = "FILE")]
    pub report: PathBuf,
    /// Zero-based sheet index for spreadsheet reports
    #[arg(long, default_value_t = 0)]
    pub sheet: usize,
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Write the augmented catalog here instead of editing it in place
    #[arg(short, long, value_name = "XML")]
    pub output: Option<PathBuf>,
    /// Only report what would be appended
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub no_backup: bool,
    /// Report rows between progress lines
    #[arg(long, value_name = "N")]
    pub progress_every: Option<u64>,
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct MergeArgs {
    #[arg(long, value_name = "FILE")]
    pub base: PathBuf,
    #[arg(long, value_name = "FILE")]
    pub other: PathBuf,
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
    #[arg(long, default_value_t = SortOrder::Occurrences)]
    pub sort: SortOrder,
    #[arg(long, default_value_t = 0)]
    pub sheet: usize,
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,
}

/// Accepts a single ASCII character, or `\t` / `tab`.
fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("delimiter must be one ASCII character, got '{raw}'")),
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<AuditConfig, Box<dyn std::error::Error>> {
    Ok(AuditConfig::load(path)?)
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Scan(_) => "scan",
        Commands::Augment(_) => "augment",
        Commands::Merge(_) => "merge",
    };
    let _guard = itemaudit_core::logging::init_logging(component, true);

    match cli.command {
        Commands::Scan(args) => {
            let config = load_config(args.config.as_deref())?;
            scan::run(args, &config)
        }
        Commands::Augment(args) => {
            let config = load_config(args.config.as_deref())?;
            augment::run(args, &config)
        }
        Commands::Merge(args) => {
            let config = load_config(args.config.as_deref())?;
            merge::run(args, &config)
        }
    }
}
