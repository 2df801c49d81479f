//! Report serialization.

use crate::report::{Report, ReportKind, ReportRow};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Spreadsheet download
    #[default]
    Csv,
    /// `{"report", "columns", "rows"}` document
    Json,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export format: {0}. Must be one of: csv, json")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn export(report: &Report, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(report),
        ExportFormat::Json => to_json(report),
    }
}

/// Header row then one record per report row, CRLF terminated, quoting only
/// where a field needs it.
pub fn to_csv(report: &Report) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(report.header())?;
    for row in report.rows() {
        writer.write_record(row.fields())?;
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

#[derive(Serialize)]
struct JsonReport<'a> {
    report: ReportKind,
    columns: Vec<&'a str>,
    rows: &'a [ReportRow],
}

pub fn to_json(report: &Report) -> Result<Vec<u8>, ExportError> {
    let document = JsonReport {
        report: report.kind(),
        columns: report.header(),
        rows: report.rows(),
    };
    Ok(serde_json::to_vec(&document)?)
}
