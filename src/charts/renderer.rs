//! Static Chart Renderer
//! Writes the dashboard charts to PNG files with plotters.
//!
//! Files, in dashboard order:
//! 1. Comparison of permit types (grouped bars)
//! 2. Low income composition (donut)
//! 3. High income composition (donut)
//! 4. Cumulative share, essentials first (lines)
//! 5. Preference gap, high minus low (horizontal bars)

use crate::stats::{ComparisonRow, CompositionSlice, CumulativeShare, DashboardView};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Colors
const LOW: RGBColor = RGBColor(255, 107, 107);
const HIGH: RGBColor = RGBColor(78, 205, 196);
const GUIDE: RGBColor = RGBColor(136, 136, 136);
const INK: RGBColor = RGBColor(51, 51, 51);

const LOW_SHADES: [RGBColor; 7] = [
    RGBColor(103, 0, 13),
    RGBColor(165, 15, 21),
    RGBColor(203, 24, 29),
    RGBColor(239, 59, 44),
    RGBColor(251, 106, 74),
    RGBColor(252, 146, 114),
    RGBColor(252, 187, 161),
];
const HIGH_SHADES: [RGBColor; 7] = [
    RGBColor(17, 36, 69),
    RGBColor(26, 70, 91),
    RGBColor(37, 109, 109),
    RGBColor(56, 143, 123),
    RGBColor(94, 173, 135),
    RGBColor(143, 199, 151),
    RGBColor(194, 223, 177),
];

const FONT: &str = "sans-serif";

type DrawResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to render {chart}: {reason}")]
    Draw { chart: String, reason: String },
}

/// Label for an integer tick on a categorical axis; blank between categories.
pub fn category_label(labels: &[String], position: f64) -> String {
    let idx = position.round();
    if (position - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Renders charts to fixed-size bitmaps.
pub struct StaticChartRenderer {
    width: u32,
    height: u32,
}

impl StaticChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Write all five charts into `dir`, returning the files written.
    pub fn export_all(&self, view: &DashboardView, dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
        std::fs::create_dir_all(dir).map_err(|source| RenderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(5);
        self.render(dir, "1_permit_type_comparison.png", &mut written, |p| {
            self.draw_comparison(p, &view.comparison)
        })?;
        self.render(dir, "2_low_income_composition.png", &mut written, |p| {
            self.draw_composition(p, "Low Income Composition", &view.low_composition, &LOW_SHADES)
        })?;
        self.render(dir, "3_high_income_composition.png", &mut written, |p| {
            self.draw_composition(p, "High Income Composition", &view.high_composition, &HIGH_SHADES)
        })?;
        self.render(dir, "4_cumulative_share.png", &mut written, |p| {
            self.draw_cumulative(p, &view.cumulative)
        })?;
        self.render(dir, "5_preference_gap.png", &mut written, |p| {
            self.draw_gap(p, &view.gap)
        })?;

        Ok(written)
    }

    fn render<F>(
        &self,
        dir: &Path,
        file: &str,
        written: &mut Vec<PathBuf>,
        draw: F,
    ) -> Result<(), RenderError>
    where
        F: FnOnce(&Path) -> DrawResult,
    {
        let path = dir.join(file);
        draw(&path).map_err(|e| RenderError::Draw {
            chart: file.to_string(),
            reason: e.to_string(),
        })?;
        log::info!("Wrote {}", path.display());
        written.push(path);
        Ok(())
    }

    fn draw_comparison(&self, path: &Path, rows: &[ComparisonRow]) -> DrawResult {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = rows.len().max(1);
        let y_max = rows
            .iter()
            .map(|r| r.low.max(r.high))
            .fold(0.0_f64, f64::max)
            .max(0.01)
            * 1.15;
        let labels: Vec<String> = rows.iter().map(|r| r.label.clone()).collect();

        let mut chart = ChartBuilder::on(&root)
            .caption("1. Comparison of Permit Types", (FONT, 28))
            .margin(20)
            .x_label_area_size(150)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..n as f64 - 0.5, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_label(&labels, *x))
            .x_label_style((FONT, 13).into_font().transform(FontTransform::Rotate90))
            .y_label_formatter(&|y| format!("{:.0}%", y * 100.0))
            .y_desc("Proportion")
            .draw()?;

        chart
            .draw_series(rows.iter().enumerate().map(|(i, r)| {
                let x = i as f64;
                Rectangle::new([(x - 0.4, 0.0), (x, r.low)], LOW.filled())
            }))?
            .label("Low")
            .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], LOW.filled()));

        chart
            .draw_series(rows.iter().enumerate().map(|(i, r)| {
                let x = i as f64;
                Rectangle::new([(x, 0.0), (x + 0.4, r.high)], HIGH.filled())
            }))?
            .label("High")
            .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], HIGH.filled()));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(GUIDE)
            .draw()?;

        root.present()?;
        Ok(())
    }

    fn draw_composition(
        &self,
        path: &Path,
        title: &str,
        slices: &[CompositionSlice],
        shades: &[RGBColor],
    ) -> DrawResult {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let area = root.titled(title, (FONT, 28))?;

        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = f64::from(w.min(h)) * 0.36;
        let sizes: Vec<f64> = slices.iter().map(|s| s.share).collect();
        let colors: Vec<RGBColor> = (0..slices.len()).map(|i| shades[i % shades.len()]).collect();
        let labels: Vec<String> = slices.iter().map(|s| s.label.clone()).collect();

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.donut_hole(radius * 0.5);
        pie.label_style((FONT, 16).into_font().color(&INK));
        pie.percentages((FONT, 14).into_font().color(&WHITE));
        area.draw(&pie)?;

        root.present()?;
        Ok(())
    }

    fn draw_cumulative(&self, path: &Path, cumulative: &CumulativeShare) -> DrawResult {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = cumulative.points.len().max(1);
        let labels: Vec<String> = cumulative.points.iter().map(|p| p.label.clone()).collect();

        let mut chart = ChartBuilder::on(&root)
            .caption("4. Cumulative Share (Essentials First)", (FONT, 28))
            .margin(20)
            .x_label_area_size(150)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..n as f64 - 0.5, 0f64..1.05)?;

        chart
            .configure_mesh()
            .x_labels(n)
            .x_label_formatter(&|x| category_label(&labels, *x))
            .x_label_style((FONT, 13).into_font().transform(FontTransform::Rotate90))
            .y_label_formatter(&|y| format!("{:.0}%", y * 100.0))
            .y_desc("Cumulative Share")
            .draw()?;

        chart
            .draw_series(
                AreaSeries::new(
                    cumulative
                        .points
                        .iter()
                        .enumerate()
                        .map(|(i, p)| (i as f64, p.low_cum)),
                    0.0,
                    LOW.mix(0.1),
                )
                .border_style(LOW.stroke_width(3)),
            )?
            .label("Low Income")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], LOW.stroke_width(3)));

        chart
            .draw_series(LineSeries::new(
                cumulative
                    .points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i as f64, p.high_cum)),
                HIGH.stroke_width(3),
            ))?
            .label("High Income")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], HIGH.stroke_width(3)));

        if cumulative.essential_count > 0 {
            let boundary = cumulative.essential_count as f64 - 0.5;
            chart
                .draw_series(LineSeries::new(
                    vec![(boundary, 0.0), (boundary, 1.05)],
                    GUIDE.stroke_width(2),
                ))?
                .label("End of Essentials")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GUIDE.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(GUIDE)
            .draw()?;

        root.present()?;
        Ok(())
    }

    fn draw_gap(&self, path: &Path, rows: &[ComparisonRow]) -> DrawResult {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = rows.len().max(1);
        let extent = rows
            .iter()
            .map(|r| r.diff.abs())
            .fold(0.0_f64, f64::max)
            .max(0.005)
            * 1.15;
        let labels: Vec<String> = rows.iter().map(|r| r.label.clone()).collect();

        let mut chart = ChartBuilder::on(&root)
            .caption("5. Preference Gap (High - Low)", (FONT, 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(200)
            .build_cartesian_2d(-extent..extent, -0.5f64..n as f64 - 0.5)?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(n)
            .y_label_formatter(&|y| category_label(&labels, *y))
            .x_label_formatter(&|x| format!("{:+.1}%", x * 100.0))
            .x_desc("Difference (High Share - Low Share)")
            .draw()?;

        chart.draw_series(rows.iter().enumerate().map(|(i, r)| {
            let y = i as f64;
            let color = if r.diff > 0.0 { HIGH } else { LOW };
            Rectangle::new([(0.0, y - 0.35), (r.diff, y + 0.35)], color.filled())
        }))?;

        chart.draw_series(LineSeries::new(
            vec![(0.0, -0.5), (0.0, n as f64 - 0.5)],
            INK.stroke_width(2),
        ))?;

        root.present()?;
        Ok(())
    }
}
