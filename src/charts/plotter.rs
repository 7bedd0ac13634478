//! Chart Plotter Module
//! Draws the dashboard charts with egui_plot.

use crate::charts::category_label;
use crate::stats::{ComparisonRow, CompositionSlice, CumulativeShare, KpiSummary};
use egui::{Color32, RichText, Stroke};
use egui_plot::{
    Bar, BarChart, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Polygon, Text, VLine,
};
use std::f64::consts::{FRAC_PI_2, TAU};

pub const LOW_COLOR: Color32 = Color32::from_rgb(255, 107, 107); // #FF6B6B
pub const HIGH_COLOR: Color32 = Color32::from_rgb(78, 205, 196); // #4ECDC4
pub const AXIS_COLOR: Color32 = Color32::from_rgb(136, 136, 136);

/// Sequential reds for the low income donut, darkest first.
pub const LOW_PALETTE: [Color32; 7] = [
    Color32::from_rgb(103, 0, 13),
    Color32::from_rgb(165, 15, 21),
    Color32::from_rgb(203, 24, 29),
    Color32::from_rgb(239, 59, 44),
    Color32::from_rgb(251, 106, 74),
    Color32::from_rgb(252, 146, 114),
    Color32::from_rgb(252, 187, 161),
];

/// Sequential teal-greens for the high income donut, darkest first.
pub const HIGH_PALETTE: [Color32; 7] = [
    Color32::from_rgb(17, 36, 69),
    Color32::from_rgb(26, 70, 91),
    Color32::from_rgb(37, 109, 109),
    Color32::from_rgb(56, 143, 123),
    Color32::from_rgb(94, 173, 135),
    Color32::from_rgb(143, 199, 151),
    Color32::from_rgb(194, 223, 177),
];

const CHART_HEIGHT: f32 = 380.0;
const DONUT_HOLE: f64 = 0.5;
const DONUT_SEGMENT_STEP: f64 = TAU / 180.0;

fn category_formatter(
    labels: Vec<String>,
) -> impl Fn(egui_plot::GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| category_label(&labels, mark.value)
}

fn percent_formatter(mark: egui_plot::GridMark, _range: &std::ops::RangeInclusive<f64>) -> String {
    format!("{:.0}%", mark.value * 100.0)
}

/// Creates the dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Four metric cards: permit counts and essential shares.
    pub fn draw_kpis(ui: &mut egui::Ui, kpis: &KpiSummary) {
        let gap = kpis.essential_gap_points();
        let cards = [
            ("Low Income Permits", format!("{}", kpis.low_count), None),
            ("High Income Permits", format!("{}", kpis.high_count), None),
            (
                "Low Income: Essential %",
                format!("{:.1}%", kpis.low_essential_share * 100.0),
                Some(("Focus on Basics".to_string(), Color32::GRAY)),
            ),
            (
                "High Income: Essential %",
                format!("{:.1}%", kpis.high_essential_share * 100.0),
                Some((
                    format!("{:+.1} pts vs Low", gap),
                    if gap <= 0.0 { HIGH_COLOR } else { LOW_COLOR },
                )),
            ),
        ];

        ui.columns(cards.len(), |columns| {
            for (ui, (title, value, delta)) in columns.iter_mut().zip(cards) {
                egui::Frame::none()
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .rounding(10.0)
                    .inner_margin(12.0)
                    .show(ui, |ui| {
                        ui.label(RichText::new(title).size(12.0).color(Color32::GRAY));
                        ui.label(RichText::new(value).size(24.0).strong());
                        if let Some((text, color)) = delta {
                            ui.label(RichText::new(text).size(11.0).color(color));
                        }
                    });
            }
        });
    }

    /// Chart 1: grouped bars of each group's share for the top permit types.
    pub fn draw_comparison_chart(ui: &mut egui::Ui, rows: &[ComparisonRow]) {
        let labels: Vec<String> = rows.iter().map(|r| r.label.clone()).collect();

        let low_bars: Vec<Bar> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Bar::new(i as f64 - 0.2, r.low)
                    .width(0.4)
                    .name(format!("{}: {:.1}%", r.label, r.low * 100.0))
            })
            .collect();
        let high_bars: Vec<Bar> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Bar::new(i as f64 + 0.2, r.high)
                    .width(0.4)
                    .name(format!("{}: {:.1}%", r.label, r.high * 100.0))
            })
            .collect();

        Plot::new("permit_type_comparison")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .x_axis_label("Permit Type")
            .y_axis_label("Proportion")
            .x_axis_formatter(category_formatter(labels))
            .y_axis_formatter(percent_formatter)
            .include_y(0.0)
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(low_bars).color(LOW_COLOR).name("Low"));
                plot_ui.bar_chart(BarChart::new(high_bars).color(HIGH_COLOR).name("High"));
            });
    }

    /// Charts 2 and 3: donut of one group's composition.
    pub fn draw_composition_chart(
        ui: &mut egui::Ui,
        id: &str,
        slices: &[CompositionSlice],
        palette: &[Color32],
    ) {
        Plot::new(id)
            .height(CHART_HEIGHT * 0.85)
            .data_aspect(1.0)
            .show_axes([false, false])
            .show_grid([false, false])
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_x(-1.1)
            .include_x(1.1)
            .include_y(-1.1)
            .include_y(1.1)
            .show(ui, |plot_ui| {
                let mut start = FRAC_PI_2;
                for (i, slice) in slices.iter().enumerate() {
                    let sweep = slice.share * TAU;
                    let color = palette[i % palette.len()];

                    for polygon in Self::ring_segments(start, sweep) {
                        plot_ui.polygon(
                            Polygon::new(polygon)
                                .fill_color(color)
                                .stroke(Stroke::new(0.0, color))
                                .name(&slice.label),
                        );
                    }

                    if slice.share >= 0.04 {
                        let mid = start - sweep / 2.0;
                        let r = (1.0 + DONUT_HOLE) / 2.0;
                        plot_ui.text(Text::new(
                            PlotPoint::new(r * mid.cos(), r * mid.sin()),
                            RichText::new(format!("{:.0}%", slice.share * 100.0))
                                .color(Color32::WHITE)
                                .strong(),
                        ));
                    }
                    start -= sweep;
                }
            });

        ui.horizontal_wrapped(|ui| {
            for (i, slice) in slices.iter().enumerate() {
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 2.0, palette[i % palette.len()]);
                ui.label(
                    RichText::new(format!("{} {:.1}%", slice.label, slice.share * 100.0))
                        .size(11.0),
                );
                ui.add_space(6.0);
            }
        });
    }

    /// Split an annular sector into convex quads so egui can fill them.
    /// Angles run clockwise from `start`.
    fn ring_segments(start: f64, sweep: f64) -> Vec<PlotPoints> {
        let steps = ((sweep / DONUT_SEGMENT_STEP).ceil() as usize).max(1);
        let step = sweep / steps as f64;

        (0..steps)
            .map(|k| {
                let a0 = start - k as f64 * step;
                let a1 = a0 - step;
                PlotPoints::from(vec![
                    [a0.cos(), a0.sin()],
                    [a1.cos(), a1.sin()],
                    [DONUT_HOLE * a1.cos(), DONUT_HOLE * a1.sin()],
                    [DONUT_HOLE * a0.cos(), DONUT_HOLE * a0.sin()],
                ])
            })
            .collect()
    }

    /// Chart 4: cumulative share curves, essentials on the left.
    pub fn draw_cumulative_chart(ui: &mut egui::Ui, cumulative: &CumulativeShare) {
        let labels: Vec<String> = cumulative.points.iter().map(|p| p.label.clone()).collect();
        let low: PlotPoints = cumulative
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| [i as f64, p.low_cum])
            .collect();
        let high: PlotPoints = cumulative
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| [i as f64, p.high_cum])
            .collect();

        Plot::new("cumulative_share")
            .height(CHART_HEIGHT * 1.1)
            .legend(Legend::default())
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .y_axis_label("Cumulative Share")
            .x_axis_formatter(category_formatter(labels))
            .y_axis_formatter(percent_formatter)
            .include_y(0.0)
            .include_y(1.0)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(low)
                        .color(LOW_COLOR)
                        .width(3.0)
                        .fill(0.0)
                        .name("Low Income"),
                );
                plot_ui.line(
                    Line::new(high)
                        .color(HIGH_COLOR)
                        .width(3.0)
                        .style(LineStyle::dotted_dense())
                        .name("High Income"),
                );

                if cumulative.essential_count > 0 {
                    plot_ui.vline(
                        VLine::new(cumulative.essential_count as f64 - 0.5)
                            .color(AXIS_COLOR)
                            .style(LineStyle::dashed_loose())
                            .name("End of Essentials"),
                    );
                }
            });
    }

    /// Chart 5: horizontal bars of `high - low`, teal right, red left.
    pub fn draw_gap_chart(ui: &mut egui::Ui, rows: &[ComparisonRow]) {
        let labels: Vec<String> = rows.iter().map(|r| r.label.clone()).collect();

        let bar = |(i, r): (usize, &ComparisonRow)| {
            Bar::new(i as f64, r.diff)
                .width(0.7)
                .name(format!("{}: {:+.1}%", r.label, r.diff * 100.0))
        };
        let right: Vec<Bar> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.diff > 0.0)
            .map(bar)
            .collect();
        let left: Vec<Bar> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.diff <= 0.0)
            .map(bar)
            .collect();

        Plot::new("preference_gap")
            .height((rows.len() as f32 * 22.0).max(CHART_HEIGHT))
            .legend(Legend::default())
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .x_axis_label("Difference (High Share - Low Share)")
            .x_axis_formatter(|mark, _range| format!("{:+.1}%", mark.value * 100.0))
            .y_axis_formatter(category_formatter(labels))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    BarChart::new(right)
                        .horizontal()
                        .color(HIGH_COLOR)
                        .name("Preferred by High Income"),
                );
                plot_ui.bar_chart(
                    BarChart::new(left)
                        .horizontal()
                        .color(LOW_COLOR)
                        .name("Preferred by Low Income"),
                );
                plot_ui.vline(VLine::new(0.0).color(Color32::from_rgb(51, 51, 51)).width(2.0));
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_axis_labels_integer_ticks() {
        let format = category_formatter(vec!["Electrical".to_string(), "HVAC".to_string()]);
        let range = 0.0..=1.0;
        let mark = |value| egui_plot::GridMark {
            value,
            step_size: 0.5,
        };
        assert_eq!(format(mark(1.0), &range), "HVAC");
        assert_eq!(format(mark(0.5), &range), "");
        assert_eq!(format(mark(2.0), &range), "");
    }

    #[test]
    fn ring_segments_cover_the_sweep() {
        let segments = ChartPlotter::ring_segments(FRAC_PI_2, TAU / 4.0);
        assert!((45..=46).contains(&segments.len()));
        let full = ChartPlotter::ring_segments(0.0, 1e-9);
        assert_eq!(full.len(), 1);
    }
}
