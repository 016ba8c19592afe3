use crate::MergeArgs;
use crate::view::{SummaryLine, render_summary};
use itemaudit_core::config::AuditConfig;
use itemaudit_core::merge::merge_files;
use itemaudit_core::report::{ExportOptions, ReadOptions, write_report};

pub fn run(args: MergeArgs, config: &AuditConfig) -> Result<(), Box<dyn std::error::Error>> {
    let read = ReadOptions {
        sheet: args.sheet,
        delimiter: args.delimiter,
    };
    let (rows, summary) = merge_files(&args.base, &args.other, &read, args.sort)?;

    let exclusion = config.exclusion_filter();
    let options = ExportOptions {
        delimiter: args.delimiter,
        image_dir: None,
        exclusion: &exclusion,
    };
    let export = write_report(&args.output, rows, &options)?;

    println!(
        "{}",
        render_summary(vec![
            SummaryLine::new("base rows", summary.base_rows),
            SummaryLine::new("other rows", summary.other_rows),
            SummaryLine::new("rows without id", summary.dropped),
            SummaryLine::new("conflicts", summary.conflicts),
            SummaryLine::new("taken from other", summary.taken_from_other),
            SummaryLine::new("rows written", export.written),
            SummaryLine::new("rows excluded", export.excluded),
            SummaryLine::new("report", args.output.display()),
        ])
    );
    Ok(())
}
