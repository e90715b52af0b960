use crate::table::Table;
use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use std::fmt;

/// Number of rows shown in the preview table
pub const PREVIEW_ROWS: usize = 20;

/// Derived metadata about the current table
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SummaryRecord {
    pub filename: String,
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub upload_time: String,
}

impl SummaryRecord {
    pub fn from_table(filename: &str, table: &Table, uploaded_at: DateTime<Local>) -> Self {
        SummaryRecord {
            filename: filename.to_string(),
            rows: table.row_count(),
            columns: table.column_count(),
            column_names: table.columns().to_vec(),
            upload_time: uploaded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// One aggregate, or the marker for an undefined one
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Aggregate {
    Value(f64),
    NotAvailable,
}

impl Aggregate {
    fn rounded(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Aggregate::Value(round2(v)),
            _ => Aggregate::NotAvailable,
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Value(v) => write!(f, "{:.2}", v),
            Aggregate::NotAvailable => write!(f, "N/A"),
        }
    }
}

impl Serialize for Aggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Aggregate::Value(v) => serializer.serialize_f64(*v),
            Aggregate::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

/// Descriptive statistics for one numeric column
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ColumnStats {
    pub column: String,
    pub mean: Aggregate,
    pub std: Aggregate,
    pub min: Aggregate,
    pub max: Aggregate,
}

/// Compute mean, sample standard deviation, min and max for every numeric column
///
/// Each aggregate is rounded to two decimals on its own. The standard
/// deviation uses the `n - 1` denominator, so a single-row column reports it
/// as not available.
pub fn describe(table: &Table) -> Vec<ColumnStats> {
    table
        .numeric_columns()
        .into_iter()
        .map(|c| {
            let values = table.numeric_values(c);
            ColumnStats {
                column: table.columns()[c].clone(),
                mean: Aggregate::rounded(mean(&values)),
                std: Aggregate::rounded(sample_std(&values)),
                min: Aggregate::rounded(values.iter().copied().reduce(f64::min)),
                max: Aggregate::rounded(values.iter().copied().reduce(f64::max)),
            }
        })
        .collect()
}

/// The first [`PREVIEW_ROWS`] rows of the table
pub fn preview(table: &Table) -> Table {
    table.head(PREVIEW_ROWS)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
