use crate::AugmentArgs;
use crate::view::{SummaryLine, render_summary};
use itemaudit_core::augment::{AugmentOptions, augment};
use itemaudit_core::config::AuditConfig;
use itemaudit_core::progress::LogProgress;
use itemaudit_core::report::ReadOptions;
use tracing::info;

pub fn run(args: AugmentArgs, config: &AuditConfig) -> Result<(), Box<dyn std::error::Error>> {
    let options = AugmentOptions {
        output: args.output,
        dry_run: args.dry_run,
        backup: !args.no_backup,
        read: ReadOptions {
            sheet: args.sheet,
            delimiter: args.delimiter,
        },
        tick_interval: args.progress_every.unwrap_or(config.progress.row_interval),
    };

    info!(
        "Augmenting {} from {}",
        args.catalog.display(),
        args.report.display()
    );
    let mut progress = LogProgress::new("report rows");
    let summary = augment(&args.catalog, &args.report, &options, &mut progress)?;

    let backup = summary
        .backup
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}",
        render_summary(vec![
            SummaryLine::new("rows scanned", summary.rows_scanned),
            SummaryLine::new("rows without id or name", summary.rows_invalid),
            SummaryLine::new("rows already covered", summary.rows_covered),
            SummaryLine::new("duplicate rows", summary.rows_duplicate),
            SummaryLine::new("candidates", summary.candidates),
            SummaryLine::new("groups", summary.groups),
            SummaryLine::new("ranges", summary.ranges),
            SummaryLine::new("singles", summary.singles),
            SummaryLine::new("entries appended", summary.appended),
            SummaryLine::new("ids appended", summary.ids_appended),
            SummaryLine::new("catalog", summary.working_file.display()),
            SummaryLine::new("backup", backup),
        ])
    );
    if summary.dry_run {
        println!("Dry run: nothing was written.");
    }
    Ok(())
}
