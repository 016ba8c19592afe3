use crate::ItemId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical report columns, in file order.
pub const COLUMNS: [&str; 11] = [
    "id",
    "occurrences",
    "example_positions",
    "article",
    "name",
    "weight_attr",
    "description_attr",
    "slotType_attr",
    "weaponType_attr",
    "armor_attr",
    "defense_attr",
];

/// Optional cosmetic column written second when an image directory is given.
pub const IMAGE_COLUMN: &str = "image";

/// A cell as read from a report file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form. Integral floats print without a fraction.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Text(s) => s.trim().to_string(),
        }
    }

    /// A strictly positive integer identifier, if the cell holds one.
    pub fn as_id(&self) -> Option<ItemId> {
        let value = match self {
            CellValue::Int(i) => *i,
            CellValue::Float(f) if f.fract() == 0.0 => *f as i64,
            CellValue::Text(s) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => {
                        let f = s.parse::<f64>().ok().filter(|f| f.fract() == 0.0)?;
                        f as i64
                    }
                }
            }
            _ => return None,
        };
        if value <= 0 {
            return None;
        }
        ItemId::try_from(value).ok()
    }

    /// Count value: digits only, anything else stripped, defaulting to 0.
    pub fn as_count(&self) -> u64 {
        match self {
            CellValue::Int(i) => (*i).max(0) as u64,
            CellValue::Float(f) if *f > 0.0 => f.trunc() as u64,
            CellValue::Text(s) => {
                let digits: String = s.chars().filter(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

/// One data row keyed by lowercased, trimmed header name.
pub type RowMap = IndexMap<String, CellValue>;

/// Normalized report row in canonical column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: ItemId,
    pub occurrences: u64,
    pub example_positions: String,
    pub article: String,
    pub name: String,
    pub weight_attr: String,
    pub description_attr: String,
    #[serde(rename = "slotType_attr")]
    pub slot_type_attr: String,
    #[serde(rename = "weaponType_attr")]
    pub weapon_type_attr: String,
    pub armor_attr: String,
    pub defense_attr: String,
}

impl ReportRow {
    /// A freshly counted row: metadata columns stay empty.
    pub fn uncovered(id: ItemId, occurrences: u64, example_positions: String) -> Self {
        Self {
            id,
            occurrences,
            example_positions,
            ..Default::default()
        }
    }

    /// Normalizes a raw row. Rows without a positive `id` yield `None`.
    pub fn from_cells(cells: &RowMap) -> Option<Self> {
        let id = cells.get("id")?.as_id()?;
        let text = |key: &str| cells.get(key).map(CellValue::as_text).unwrap_or_default();

        Some(Self {
            id,
            occurrences: cells.get("occurrences").map(CellValue::as_count).unwrap_or(0),
            example_positions: text("example_positions"),
            article: text("article"),
            name: text("name"),
            weight_attr: text("weight_attr"),
            description_attr: text("description_attr"),
            slot_type_attr: text("slottype_attr"),
            weapon_type_attr: text("weapontype_attr"),
            armor_attr: text("armor_attr"),
            defense_attr: text("defense_attr"),
        })
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Eligible for appending to the catalog (coverage not considered).
    pub fn is_candidate(&self) -> bool {
        self.id > 0 && self.has_name()
    }

    /// Cell strings in [`COLUMNS`] order.
    pub fn fields(&self) -> [String; 11] {
        [
            self.id.to_string(),
            self.occurrences.to_string(),
            self.example_positions.clone(),
            self.article.clone(),
            self.name.clone(),
            self.weight_attr.clone(),
            self.description_attr.clone(),
            self.slot_type_attr.clone(),
            self.weapon_type_attr.clone(),
            self.armor_attr.clone(),
            self.defense_attr.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> RowMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn id_parsing() {
        assert_eq!(CellValue::Int(12).as_id(), Some(12));
        assert_eq!(CellValue::Float(12.0).as_id(), Some(12));
        assert_eq!(CellValue::Text(" 12 ".into()).as_id(), Some(12));
        assert_eq!(CellValue::Text("12.0".into()).as_id(), Some(12));
        assert_eq!(CellValue::Float(12.5).as_id(), None);
        assert_eq!(CellValue::Int(0).as_id(), None);
        assert_eq!(CellValue::Text("-3".into()).as_id(), None);
        assert_eq!(CellValue::Text("abc".into()).as_id(), None);
        assert_eq!(CellValue::Empty.as_id(), None);
    }

    #[test]
    fn count_strips_non_digits() {
        assert_eq!(CellValue::Text("1,234".into()).as_count(), 1234);
        assert_eq!(CellValue::Text("x".into()).as_count(), 0);
        assert_eq!(CellValue::Float(7.0).as_count(), 7);
        assert_eq!(CellValue::Int(-2).as_count(), 0);
        assert_eq!(CellValue::Empty.as_count(), 0);
    }

    #[test]
    fn from_cells_normalizes() {
        let cells = row(&[
            ("id", CellValue::Float(55.0)),
            ("occurrences", CellValue::Text("9".into())),
            ("name", CellValue::Text("  torch ".into())),
            ("slottype_attr", CellValue::Text("hand".into())),
            ("image", CellValue::Text("55.png".into())),
        ]);
        let parsed = ReportRow::from_cells(&cells).unwrap();
        assert_eq!(parsed.id, 55);
        assert_eq!(parsed.occurrences, 9);
        assert_eq!(parsed.name, "torch");
        assert_eq!(parsed.article, "");
        assert_eq!(parsed.slot_type_attr, "hand");
        assert!(parsed.is_candidate());
    }

    #[test]
    fn rows_without_id_are_dropped() {
        assert!(ReportRow::from_cells(&row(&[("name", CellValue::Text("x".into()))])).is_none());
        assert!(ReportRow::from_cells(&row(&[("id", CellValue::Text("zero".into()))])).is_none());
    }

    #[test]
    fn fields_follow_column_order() {
        let r = ReportRow::uncovered(3, 4, "1:1:7".into());
        let fields = r.fields();
        assert_eq!(fields.len(), COLUMNS.len());
        assert_eq!(fields[0], "3");
        assert_eq!(fields[1], "4");
        assert_eq!(fields[2], "1:1:7");
        assert!(fields[3..].iter().all(String::is_empty));
        assert!(!r.is_candidate());
    }
}
