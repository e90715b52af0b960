use crate::cell::Value;
use serde_json::{Map, Value as JsonValue};

/// A parsed spreadsheet: named columns in a stable order plus rows of cells
///
/// Rows are stored positionally; `rows[r][c]` is the value of column
/// `columns[c]` in row `r`. Every row has exactly `columns.len()` cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from a header and rows
    ///
    /// Header names are cleaned up the way spreadsheet readers usually do it:
    /// a blank name becomes `Unnamed: <index>` and a repeated name gets a
    /// `.<n>` suffix. Short rows are padded with `Empty`, long rows truncated.
    pub fn new(header: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = dedupe_columns(header);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Empty);
                row
            })
            .collect();

        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// All values of one column, top to bottom
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Columns whose every value is numeric
    ///
    /// A column with no rows, or with any missing or non-numeric value, is
    /// not numeric.
    pub fn numeric_columns(&self) -> Vec<usize> {
        if self.rows.is_empty() {
            return Vec::new();
        }

        (0..self.columns.len())
            .filter(|&c| self.column_values(c).all(|v| v.as_f64().is_some()))
            .collect()
    }

    /// Numeric values of a column, skipping anything that is not a number
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.column_values(index).filter_map(Value::as_f64).collect()
    }

    /// A new table holding the first `n` rows
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// A new table holding the rows at the given indices, in that order
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// The first `limit` rows as JSON records keyed by column name
    pub fn records(&self, limit: usize) -> Vec<Map<String, JsonValue>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(name, value)| {
                        (
                            name.clone(),
                            serde_json::to_value(value).unwrap_or(JsonValue::Null),
                        )
                    })
                    .collect()
            })
            .collect()
    }

    /// Every cell rendered as display text, row by row
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Value::to_string).collect())
            .collect()
    }
}

fn dedupe_columns(header: Vec<String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(header.len());

    for (i, name) in header.into_iter().enumerate() {
        let name = name.trim().to_string();
        let base = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut n = 1;
        while columns.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        columns.push(candidate);
    }

    columns
}
