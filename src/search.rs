use crate::table::Table;

/// Indices of rows where any cell contains `query`, ignoring case
///
/// Every cell is compared through its display form, so numbers match on
/// their digits. The query is trimmed first; an empty query matches nothing.
pub fn matching_rows(table: &Table, query: &str) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row.iter()
                .any(|cell| cell.to_string().to_lowercase().contains(&needle))
        })
        .map(|(i, _)| i)
        .collect()
}

/// The rows matching `query` as a new table with the same columns
pub fn search_table(table: &Table, query: &str) -> Table {
    table.select_rows(&matching_rows(table, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Value;

    fn papers() -> Table {
        Table::new(
            vec!["title".into(), "year".into()],
            vec![
                vec![Value::Text("Graph Theory".into()), Value::Int(1998)],
                vec![Value::Text("Deep Learning".into()), Value::Int(2015)],
                vec![Value::Empty, Value::Int(2020)],
            ],
        )
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        assert!(matching_rows(&papers(), "").is_empty());
        assert!(matching_rows(&papers(), "   ").is_empty());
    }

    #[test]
    fn test_no_match() {
        assert!(search_table(&papers(), "quantum").rows().is_empty());
    }

    #[test]
    fn test_case_insensitive_substring() {
        assert_eq!(matching_rows(&papers(), "GRAPH"), vec![0]);
        assert_eq!(matching_rows(&papers(), "learn"), vec![1]);
    }

    #[test]
    fn test_numbers_are_searched_as_text() {
        assert_eq!(matching_rows(&papers(), "20"), vec![1, 2]);
        let found = search_table(&papers(), "1998");
        assert_eq!(found.columns(), papers().columns());
        assert_eq!(found.row_count(), 1);
    }
}
