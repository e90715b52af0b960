#![cfg(feature = "web")]
use crate::chart::Chart;
use crate::error::{AppError, AppResult};
use crate::stats::{ColumnStats, PREVIEW_ROWS, SummaryRecord};
use crate::table::Table;
use handlebars::Handlebars;
use serde_json::json;

const CSS: &str = include_str!("./static/layout.css");

/// HTML page renderer backed by the embedded handlebars templates
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();
        for (name, source) in [
            ("index", include_str!("./static/index.html")),
            ("analysis", include_str!("./static/analysis.html")),
            ("search", include_str!("./static/search.html")),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(|e| AppError::Internal(format!("template {}: {}", name, e)))?;
        }
        Ok(Pages { registry })
    }

    /// Landing page with the upload form, the current summary and an optional error
    pub fn index(
        &self,
        summary: Option<&SummaryRecord>,
        allowed: &[String],
        error: Option<&str>,
    ) -> AppResult<String> {
        let data = json!({
            "css": CSS,
            "summary": summary,
            "allowed": allowed,
            "error": error,
        });
        Ok(self.registry.render("index", &data)?)
    }

    /// Summary, statistics, optional chart and the preview rows
    pub fn analysis(
        &self,
        summary: &SummaryRecord,
        preview: &Table,
        stats: &[ColumnStats],
        chart: Option<&Chart>,
    ) -> AppResult<String> {
        let stats: Vec<_> = stats
            .iter()
            .map(|s| {
                json!({
                    "column": s.column,
                    "mean": s.mean.to_string(),
                    "std": s.std.to_string(),
                    "min": s.min.to_string(),
                    "max": s.max.to_string(),
                })
            })
            .collect();

        let data = json!({
            "css": CSS,
            "summary": summary,
            "stats": stats,
            "chart": chart.map(Chart::data_uri),
            "preview_rows": PREVIEW_ROWS.min(preview.row_count()),
            "columns": preview.columns(),
            "rows": preview.display_rows(),
        });
        Ok(self.registry.render("analysis", &data)?)
    }

    /// Search form and the matching rows
    pub fn search(&self, filename: &str, query: &str, matches: &Table) -> AppResult<String> {
        let data = json!({
            "css": CSS,
            "filename": filename,
            "query": query,
            "count": matches.row_count(),
            "columns": matches.columns(),
            "rows": matches.display_rows(),
        });
        Ok(self.registry.render("search", &data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Value;
    use crate::stats::{describe, preview};
    use chrono::Local;

    fn table() -> Table {
        Table::new(
            vec!["title".into(), "n".into()],
            vec![
                vec![Value::Text("<script>".into()), Value::Int(1)],
                vec![Value::Text("Beta".into()), Value::Int(3)],
            ],
        )
    }

    #[test]
    fn test_index_without_data() {
        let pages = Pages::new().unwrap();
        let html = pages.index(None, &["csv".to_string()], Some("Invalid file type")).unwrap();
        assert!(html.contains("Invalid file type"));
        assert!(html.contains(".csv"));
        assert!(!html.contains("Current data"));
    }

    #[test]
    fn test_analysis_escapes_cells() {
        let pages = Pages::new().unwrap();
        let t = table();
        let summary = SummaryRecord::from_table("t.csv", &t, Local::now());
        let html = pages
            .analysis(&summary, &preview(&t), &describe(&t), None)
            .unwrap();

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("2.00"));
        assert!(!html.contains("Distribution"));
    }

    #[test]
    fn test_search_page_counts() {
        let pages = Pages::new().unwrap();
        let html = pages.search("t.csv", "beta", &table().select_rows(&[1])).unwrap();
        assert!(html.contains("1 matching rows"));
        assert!(html.contains("Beta"));
    }
}
