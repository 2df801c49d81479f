use adinsights_core::{FieldSet, Metric, PlatformId};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;

/// Leading columns of every report, before the metric columns.
pub const FIXED_COLUMNS: [&str; 2] = ["Platform", "Account Name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// One row per account of a single platform
    PlatformSummary,
    /// One row per insight record across all platforms
    GeneralReport,
    /// One row per platform, summed over its accounts
    GeneralSummary,
}

impl ReportKind {
    /// File name offered for the CSV download.
    pub fn csv_file_name(self) -> &'static str {
        match self {
            ReportKind::PlatformSummary => "summary.csv",
            ReportKind::GeneralReport => "general_report.csv",
            ReportKind::GeneralSummary => "general_summary.csv",
        }
    }
}

/// A single report value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    /// A summed total.
    Metric(Metric),
    /// Any other JSON value copied from an insight. Numbers keep their
    /// upstream text.
    Raw(Value),
}

impl Cell {
    pub fn from_json(value: &Value) -> Cell {
        match value {
            Value::Null => Cell::Empty,
            Value::String(text) => Cell::Text(text.clone()),
            other => Cell::Raw(other.clone()),
        }
    }

    /// Text written into a CSV field.
    pub fn to_field(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Metric(metric) => metric.to_string(),
            Cell::Raw(value) => value.to_string(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_str(""),
            Cell::Text(text) => serializer.serialize_str(text),
            Cell::Metric(metric) => metric.serialize(serializer),
            Cell::Raw(value) => value.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub platform: PlatformId,
    /// Blank for per-platform totals.
    pub account_name: String,
    pub cells: Vec<Cell>,
}

impl ReportRow {
    /// The row as CSV fields, fixed columns first.
    pub fn fields(&self) -> impl Iterator<Item = String> + '_ {
        [self.platform.to_string(), self.account_name.clone()]
            .into_iter()
            .chain(self.cells.iter().map(Cell::to_field))
    }
}

impl Serialize for ReportRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(FIXED_COLUMNS.len() + self.cells.len()))?;
        seq.serialize_element(self.platform.as_str())?;
        seq.serialize_element(&self.account_name)?;
        for cell in &self.cells {
            seq.serialize_element(cell)?;
        }
        seq.end()
    }
}

/// A header plus ordered rows. Every row has one cell per metric column.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    kind: ReportKind,
    columns: Vec<String>,
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn new(kind: ReportKind, columns: Vec<String>) -> Self {
        Self {
            kind,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: ReportRow) {
        debug_assert_eq!(row.cells.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Metric columns only.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Full header: `Platform`, `Account Name`, then the metric columns.
    pub fn header(&self) -> Vec<&str> {
        FIXED_COLUMNS
            .iter()
            .copied()
            .chain(self.columns.iter().map(String::as_str))
            .collect()
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }
}

/// Union of field sets in first-seen order.
#[derive(Debug, Default)]
pub struct ColumnUnion {
    columns: Vec<String>,
    seen: HashSet<String>,
}

impl ColumnUnion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, fields: &FieldSet) {
        for field in fields.iter() {
            if self.seen.insert(field.to_string()) {
                self.columns.push(field.to_string());
            }
        }
    }

    pub fn into_columns(self) -> Vec<String> {
        self.columns
    }
}
