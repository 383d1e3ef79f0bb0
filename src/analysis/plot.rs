//! Scatter plot rendering for clustering results

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

/// Point labels longer than this are truncated with "..."
pub const MAX_LABEL_CHARS: usize = 20;

const PALETTE: [(u8, u8, u8); 8] = [
    (68, 1, 84),
    (33, 145, 140),
    (253, 231, 37),
    (59, 82, 139),
    (94, 201, 98),
    (228, 87, 46),
    (142, 68, 173),
    (243, 156, 18),
];

/// RGB color assigned to a cluster index
pub fn cluster_color(cluster: usize) -> (u8, u8, u8) {
    PALETTE[cluster % PALETTE.len()]
}

/// Shorten a label to the plotting limit
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let prefix: String = label.chars().take(MAX_LABEL_CHARS).collect();
        format!("{}...", prefix)
    } else {
        label.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

/// One legend entry and its points
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub name: String,
    pub color: (u8, u8, u8),
    pub points: Vec<PlotPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<PlotSeries>,
}

impl ScatterPlot {
    /// Padded (x, y) ranges covering every point
    pub fn bounds(&self) -> ((f64, f64), (f64, f64)) {
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
        for point in self.series.iter().flat_map(|s| s.points.iter()) {
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }
        if min_x > max_x {
            (min_x, max_x, min_y, max_y) = (-1.0, 1.0, -1.0, 1.0);
        }
        (padded_range(min_x, max_x), padded_range(min_y, max_y))
    }
}

/// Writes a scatter plot image to disk
pub trait ScatterPlotter: Send + Sync {
    /// File extension of produced images
    fn extension(&self) -> &'static str;

    fn render(&self, plot: &ScatterPlot, path: &Path) -> Result<()>;
}

/// Renders plots as PNG bitmaps
#[derive(Debug, Clone)]
pub struct PngScatterPlotter {
    pub width: u32,
    pub height: u32,
}

impl Default for PngScatterPlotter {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 800,
        }
    }
}

impl PngScatterPlotter {
    fn draw(&self, plot: &ScatterPlot, path: &Path) -> Result<()> {
        let ((min_x, max_x), (min_y, max_y)) = plot.bounds();

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&plot.title, ("sans-serif", 26))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(min_x..max_x, min_y..max_y)?;

        chart
            .configure_mesh()
            .x_desc(plot.x_label.as_str())
            .y_desc(plot.y_label.as_str())
            .axis_desc_style(("sans-serif", 16))
            .draw()?;

        for series in &plot.series {
            let (r, g, b) = series.color;
            let color = RGBColor(r, g, b);
            chart
                .draw_series(series.points.iter().map(|point| {
                    EmptyElement::at((point.x, point.y))
                        + Circle::new((0, 0), 7, color.mix(0.75).filled())
                        + Text::new(truncate_label(&point.label), (10, -12), ("sans-serif", 13).into_font())
                }))?
                .label(series.name.as_str())
                .legend(move |(x, y)| Circle::new((x + 8, y), 6, color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .label_font(("sans-serif", 14))
            .draw()?;

        root.present()?;
        Ok(())
    }
}

impl ScatterPlotter for PngScatterPlotter {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn render(&self, plot: &ScatterPlot, path: &Path) -> Result<()> {
        self.draw(plot, path)
            .with_context(|| format!("Failed to write plot image: {}", path.display()))
    }
}

fn padded_range(min: f64, max: f64) -> (f64, f64) {
    if (max - min).abs() < 1e-9 {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.1;
        (min - pad, max + pad)
    }
}
