use itemaudit_core::report::ReportRow;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Terminal view of one uncovered identifier
#[derive(Tabled)]
pub struct UncoveredView {
    #[tabled(rename = "Id")]
    pub id: u32,
    #[tabled(rename = "Count")]
    pub occurrences: u64,
    #[tabled(rename = "Example positions")]
    pub positions: String,
}

impl From<&ReportRow> for UncoveredView {
    fn from(row: &ReportRow) -> Self {
        Self {
            id: row.id,
            occurrences: row.occurrences,
            positions: shorten(&row.example_positions, 48),
        }
    }
}

/// Key/value lines of a run summary
#[derive(Tabled)]
pub struct SummaryLine {
    #[tabled(rename = "")]
    pub label: &'static str,
    #[tabled(rename = "")]
    pub value: String,
}

impl SummaryLine {
    pub fn new(label: &'static str, value: impl ToString) -> Self {
        Self {
            label,
            value: value.to_string(),
        }
    }
}

pub fn render_rows(rows: &[ReportRow]) -> String {
    let views: Vec<UncoveredView> = rows.iter().map(UncoveredView::from).collect();
    Table::new(&views).with(Style::psql()).to_string()
}

pub fn render_summary(lines: Vec<SummaryLine>) -> String {
    Table::new(lines).with(Style::blank()).to_string()
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}
