#![cfg(feature = "web")]
use crate::table::Table;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::io::Cursor;

/// At most this many numeric columns are drawn
pub const MAX_CHART_COLUMNS: usize = 5;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Distribution of Numeric Columns".to_string(),
            width: 1000,
            height: 600,
        }
    }
}

/// A rendered PNG chart, base64-encoded for inline embedding
#[derive(Clone, Debug)]
pub struct Chart {
    pub png_base64: String,
}

impl Chart {
    /// `data:` URI usable directly as an `<img src>`
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.png_base64)
    }
}

/// Box plot of the first numeric columns of `table`
///
/// The chart is decorative: when there is nothing numeric to draw, or
/// rendering fails for any reason (missing fonts, encoder error), the failure
/// is logged and `None` is returned.
pub fn render_boxplot(table: &Table, options: &ChartOptions) -> Option<Chart> {
    let series: Vec<(String, Vec<f64>)> = table
        .numeric_columns()
        .into_iter()
        .take(MAX_CHART_COLUMNS)
        .map(|c| (table.columns()[c].clone(), table.numeric_values(c)))
        .filter(|(_, values)| !values.is_empty())
        .collect();

    if series.is_empty() {
        return None;
    }

    match draw_boxplot(&series, options) {
        Ok(png) => Some(Chart {
            png_base64: BASE64.encode(png),
        }),
        Err(e) => {
            log::warn!("Chart rendering failed: {}", e);
            None
        }
    }
}

/// Draws the box plot into an in-memory RGB buffer and encodes it as PNG
fn draw_boxplot(
    series: &[(String, Vec<f64>)],
    options: &ChartOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let labels: Vec<String> = series.iter().map(|(name, _)| name.clone()).collect();
    let quartiles: Vec<Quartiles> = series
        .iter()
        .map(|(_, v)| Quartiles::new(v.as_slice()))
        .collect();

    let (low, high) = quartiles
        .iter()
        .flat_map(|q| q.values())
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((high - low) * 0.1).max(1.0);
    let y_range = (low - pad)..(high + pad);

    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(120)
            .y_label_area_size(60)
            .build_cartesian_2d(labels[..].into_segmented(), y_range)?;

        chart
            .configure_mesh()
            .x_label_style(
                ("sans-serif", 14)
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .x_label_formatter(&|v| match v {
                SegmentValue::Exact(name) | SegmentValue::CenterOf(name) => name.to_string(),
                SegmentValue::Last => String::new(),
            })
            .y_desc("Value")
            .draw()?;

        chart.draw_series(
            labels
                .iter()
                .zip(quartiles.iter())
                .map(|(name, q)| Boxplot::new_vertical(SegmentValue::CenterOf(name), q)),
        )?;

        root.present()?;
    }

    let image = image::RgbImage::from_raw(options.width, options.height, buffer)
        .ok_or("chart buffer has the wrong size")?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)?;

    Ok(png)
}
