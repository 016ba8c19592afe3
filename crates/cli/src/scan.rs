use crate::ScanArgs;
use crate::view::{SummaryLine, render_rows, render_summary};
use itemaudit_core::aggregate::OccurrenceAggregator;
use itemaudit_core::catalog::load_coverage;
use itemaudit_core::config::AuditConfig;
use itemaudit_core::decoder::decode_map;
use itemaudit_core::progress::LogProgress;
use itemaudit_core::records::RecordReader;
use itemaudit_core::report::{ExportOptions, ReportRow, write_report};
use tracing::info;

pub fn run(args: ScanArgs, config: &AuditConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Holds the decoded records until the scan is over
    let scratch = match (&args.records, &args.records_out) {
        (None, None) => Some(tempfile::tempdir()?),
        _ => None,
    };
    let records = match (&args.records, &args.map) {
        (Some(records), _) => records.clone(),
        (None, Some(map)) => {
            let target = match (&args.records_out, &scratch) {
                (Some(path), _) => path.clone(),
                (None, Some(dir)) => dir.path().join("records.jsonl"),
                (None, None) => return Err("no location for decoded records".into()),
            };
            decode_map(&config.decoder, map, &target)?;
            target
        }
        (None, None) => return Err("either --map or --records is required".into()),
    };

    info!("Indexing catalog {}", args.catalog.display());
    let index = load_coverage(&args.catalog)?;
    info!(
        "Catalog covers {} single ids and {} ranges",
        index.single_count(),
        index.ranges().len()
    );

    let mut aggregator =
        OccurrenceAggregator::new().with_tick_interval(config.progress.record_interval);
    let mut progress = LogProgress::new("records");
    let reader = RecordReader::open(&records)?;
    let counts = aggregator.count(reader, &index, args.sample, &mut progress)?;

    let exclusion = config.exclusion_filter();
    let options = ExportOptions {
        delimiter: args.delimiter,
        image_dir: args.images.as_deref(),
        exclusion: &exclusion,
    };
    let export = write_report(&args.output, aggregator.result(args.sort), &options)?;

    if args.preview > 0 {
        let top: Vec<ReportRow> = aggregator
            .result(args.sort)
            .filter(|row| !exclusion.is_excluded(row.id))
            .take(args.preview)
            .collect();
        if !top.is_empty() {
            println!("{}", render_rows(&top));
        }
    }

    println!(
        "{}",
        render_summary(vec![
            SummaryLine::new("records processed", counts.processed),
            SummaryLine::new("uncovered records", counts.uncovered),
            SummaryLine::new("distinct uncovered ids", aggregator.distinct()),
            SummaryLine::new("sample truncated", counts.truncated),
            SummaryLine::new("rows written", export.written),
            SummaryLine::new("rows excluded", export.excluded),
            SummaryLine::new("images", export.images),
            SummaryLine::new("report", args.output.display()),
        ])
    );
    Ok(())
}
