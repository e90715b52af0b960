use crate::cell::Value;
use crate::error::{AppError, AppResult};
use crate::table::Table;
use chrono::{DateTime, Local};

/// Supported export formats
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    #[cfg(feature = "web")]
    Xlsx,
}

impl ExportFormat {
    /// Parse a `format` query value; missing means CSV
    pub fn parse(value: Option<&str>) -> AppResult<Self> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("csv") => Ok(ExportFormat::Csv),
            #[cfg(feature = "web")]
            Some("xlsx") => Ok(ExportFormat::Xlsx),
            Some(other) => Err(AppError::Validation(format!(
                "Unsupported export format: {}",
                other
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            #[cfg(feature = "web")]
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            #[cfg(feature = "web")]
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// Render `table` in this format
    pub fn render(self, table: &Table) -> AppResult<Vec<u8>> {
        match self {
            ExportFormat::Csv => to_csv(table),
            #[cfg(feature = "web")]
            ExportFormat::Xlsx => to_xlsx(table),
        }
    }
}

/// Attachment name for an export taken at `now`
///
/// # Examples
/// ```
/// use chrono::{Local, TimeZone};
/// use sheetscope::downloader::{ExportFormat, export_filename};
///
/// let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
/// assert_eq!(export_filename(ExportFormat::Csv, at), "data_export_20240309_140507.csv");
/// ```
pub fn export_filename(format: ExportFormat, now: DateTime<Local>) -> String {
    format!(
        "data_export_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Convert a table to CSV
///
/// The header row is the column names in ingest order; missing cells are
/// written as empty fields. Quoting of commas, quotes and newlines is left to
/// the csv writer.
pub fn to_csv(table: &Table) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Value::to_string))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Convert a table to XLSX format
///
/// Numbers and booleans keep their cell type so the workbook re-imports with
/// the same values; missing cells are left blank.
#[cfg(feature = "web")]
pub fn to_xlsx(table: &Table) -> AppResult<Vec<u8>> {
    use rust_xlsxwriter::Workbook;

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| AppError::Internal(e.to_string());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (c, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string(0, c as u16, name.as_str())
            .map_err(xlsx_err)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let c = c as u16;
            match value {
                Value::Empty => {}
                Value::Bool(b) => {
                    worksheet.write_boolean(r, c, *b).map_err(xlsx_err)?;
                }
                Value::Int(i) => {
                    worksheet.write_number(r, c, *i as f64).map_err(xlsx_err)?;
                }
                Value::Float(f) => {
                    worksheet.write_number(r, c, *f).map_err(xlsx_err)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(r, c, s.as_str()).map_err(xlsx_err)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(xlsx_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_table;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> Table {
        Table::new(
            vec!["title".into(), "year".into(), "score".into(), "open".into()],
            vec![
                vec![
                    Value::Text("Commas, \"quotes\"".into()),
                    Value::Int(2001),
                    Value::Float(1.5),
                    Value::Bool(true),
                ],
                vec![
                    Value::Text("Plain".into()),
                    Value::Empty,
                    Value::Float(2.0),
                    Value::Bool(false),
                ],
            ],
        )
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.csv");
        fs::write(&path, to_csv(&sample()).unwrap()).unwrap();

        let reparsed = load_table(&path).unwrap();
        assert_eq!(reparsed, sample());
    }

    #[test]
    fn test_csv_header_first() {
        let csv = String::from_utf8(to_csv(&sample()).unwrap()).unwrap();
        assert!(csv.starts_with("title,year,score,open\n"));
        assert!(csv.contains("Plain,,2.0,False"));
    }

    #[cfg(feature = "web")]
    #[test]
    fn test_xlsx_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.xlsx");
        fs::write(&path, to_xlsx(&sample()).unwrap()).unwrap();

        let reparsed = load_table(&path).unwrap();
        assert_eq!(reparsed.columns(), sample().columns());
        assert_eq!(reparsed.row_count(), 2);
        assert_eq!(reparsed.rows()[0][0], Value::Text("Commas, \"quotes\"".into()));
        assert_eq!(reparsed.rows()[0][1], Value::Int(2001));
        assert_eq!(reparsed.rows()[1][1], Value::Empty);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse(None).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse(Some("CSV")).unwrap(), ExportFormat::Csv);
        assert!(ExportFormat::parse(Some("pdf")).is_err());
    }
}
