use crate::cell::{NA_TOKENS, Value};
use crate::error::{AppError, AppResult};
use crate::table::Table;
use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

/// Load a table from a CSV file
///
/// The first record is the header. Each field is typed with [`Value::infer`],
/// so missing values come back as `Value::Empty`. Records shorter than the
/// header are padded; a record with more fields than the header is an error.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `AppResult<Table>` - The loaded table or a parse error
///
/// # Examples
/// ```no_run
/// use sheetscope::loader::from_csv;
///
/// match from_csv("data.csv") {
///     Ok(table) => println!("Loaded {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> AppResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(filepath)?;

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if header.is_empty() {
        return Err(AppError::Parse("No columns to parse from file".to_string()));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > header.len() {
            return Err(AppError::Parse(format!(
                "Expected {} fields in line {}, saw {}",
                header.len(),
                line + 2,
                record.len()
            )));
        }
        rows.push(record.iter().map(Value::infer).collect());
    }

    Ok(Table::new(header, rows))
}

/// Load a table from the first worksheet of an Excel file
///
/// Works for both `.xlsx` and legacy `.xls`; the format is picked from the
/// file extension. The first row of the used range is the header.
///
/// # Examples
/// ```no_run
/// use sheetscope::loader::from_excel;
///
/// match from_excel("data.xlsx") {
///     Ok(table) => println!("Loaded Excel with {} rows", table.row_count()),
///     Err(e) => eprintln!("Error loading Excel: {}", e),
/// }
/// ```
pub fn from_excel(filepath: impl AsRef<Path>) -> AppResult<Table> {
    let mut workbook = open_workbook_auto(filepath)?;

    // Get the first worksheet
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::Parse("No sheets found in Excel file".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| excel_value(c).to_string()).collect(),
        None => return Err(AppError::Parse("Excel sheet is empty".to_string())),
    };

    let body = rows
        .map(|cells| cells.iter().map(excel_value).collect())
        .collect();

    Ok(Table::new(header, body))
}

fn excel_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::Int(i) => Value::Int(*i),
        // Excel stores every number as a float; whole ones read back as integers
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::Int(*f as i64),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if NA_TOKENS.contains(&s.trim()) => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Empty,
        other => Value::Text(other.to_string()),
    }
}

/// Detect file type and load appropriate format
///
/// # Examples
/// ```no_run
/// use sheetscope::loader::load_table;
///
/// match load_table("uploads/data.csv") {
///     Ok(table) => println!("Loaded {} columns", table.column_count()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_table(filepath: impl AsRef<Path>) -> AppResult<Table> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let table = match extension.as_deref() {
        Some("csv") => from_csv(path),
        Some("xlsx") | Some("xls") => from_excel(path),
        Some(ext) => Err(AppError::Validation(format!(
            "Unsupported file extension: {}",
            ext
        ))),
        None => Err(AppError::Validation("File has no extension".to_string())),
    }?;

    log::info!(
        "Parsed {} into {} rows x {} columns",
        path.display(),
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_csv_with_missing_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("papers.csv");
        fs::write(&path, "title,year,citations\nAlpha,2001,10\nBeta,,3\n\"Gamma, Delta\",2010,\n").unwrap();

        let table = from_csv(&path).unwrap();
        assert_eq!(table.columns(), &["title", "year", "citations"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows()[1][1], Value::Empty);
        assert_eq!(table.rows()[2][0], Value::Text("Gamma, Delta".into()));
        assert_eq!(table.rows()[2][2], Value::Empty);
    }

    #[test]
    fn test_csv_short_record_is_padded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, "a,b,c\n1,2\n").unwrap();

        let table = from_csv(&path).unwrap();
        assert_eq!(table.rows()[0], vec![Value::Int(1), Value::Int(2), Value::Empty]);
    }

    #[test]
    fn test_csv_long_record_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.csv");
        fs::write(&path, "a,b\n1,2,3\n").unwrap();

        assert!(matches!(from_csv(&path), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_empty_csv_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        assert!(matches!(from_csv(&path), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_corrupt_xlsx_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"definitely not a zip archive").unwrap();

        assert!(matches!(load_table(&path), Err(AppError::Parse(_))));
    }

    #[cfg(feature = "web")]
    #[test]
    fn test_xlsx_first_sheet() {
        use rust_xlsxwriter::Workbook;

        let dir = tempdir().unwrap();
        let path = dir.path().join("papers.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "title").unwrap();
        sheet.write_string(0, 1, "citations").unwrap();
        sheet.write_string(1, 0, "Alpha").unwrap();
        sheet.write_number(1, 1, 12.0).unwrap();
        sheet.write_string(2, 0, "Beta").unwrap();
        sheet.write_number(2, 1, 4.5).unwrap();
        workbook.save(&path).unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.columns(), &["title", "citations"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][1], Value::Int(12));
        assert_eq!(table.rows()[1][1], Value::Float(4.5));
    }

    #[cfg(feature = "web")]
    #[test]
    fn test_xlsx_na_strings_are_missing() {
        use rust_xlsxwriter::Workbook;

        let dir = tempdir().unwrap();
        let path = dir.path().join("gaps.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "x").unwrap();
        sheet.write_number(1, 0, 1.0).unwrap();
        sheet.write_string(2, 0, "NA").unwrap();
        sheet.write_string(3, 0, "#N/A").unwrap();
        sheet.write_string(4, 0, " N/A ").unwrap();
        sheet.write_number(5, 0, 3.0).unwrap();
        workbook.save(&path).unwrap();

        let xlsx = load_table(&path).unwrap();

        let csv_path = dir.path().join("gaps.csv");
        fs::write(&csv_path, "x\n1\nNA\n#N/A\n N/A \n3\n").unwrap();
        let csv = load_table(&csv_path).unwrap();

        for r in 1..4 {
            assert_eq!(xlsx.rows()[r][0], Value::Empty);
        }
        assert_eq!(xlsx, csv);
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            load_table("notes.txt"),
            Err(AppError::Validation(_))
        ));
    }
}
