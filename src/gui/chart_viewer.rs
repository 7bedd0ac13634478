//! Chart Viewer Widget
//! Right side scrollable panel with the KPI cards and the five charts.

use crate::charts::{ChartPlotter, HIGH_PALETTE, LOW_PALETTE};
use crate::stats::DashboardView;
use egui::{Color32, RichText, ScrollArea};

const SECTION_SPACING: f32 = 20.0;

/// What the viewer currently has to show.
#[derive(Debug, Clone, Default)]
pub enum ViewerState {
    #[default]
    Empty,
    Ready(Box<DashboardView>),
    /// Selection produced an empty group; recoverable by changing filters.
    Warning(String),
    /// Data could not be loaded at all.
    Error(String),
}

#[derive(Default)]
pub struct ChartViewer {
    state: ViewerState,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_view(&mut self, view: DashboardView) {
        self.state = ViewerState::Ready(Box::new(view));
    }

    pub fn set_warning(&mut self, message: impl Into<String>) {
        self.state = ViewerState::Warning(message.into());
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.state = ViewerState::Error(message.into());
    }

    pub fn view(&self) -> Option<&DashboardView> {
        match &self.state {
            ViewerState::Ready(view) => Some(&**view),
            _ => None,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let view = match &self.state {
            ViewerState::Ready(view) => view,
            ViewerState::Empty => {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("No Data").size(20.0));
                });
                return;
            }
            ViewerState::Warning(message) => {
                Self::draw_banner(ui, "Warning", message, Color32::from_rgb(255, 193, 7));
                return;
            }
            ViewerState::Error(message) => {
                Self::draw_banner(ui, "Critical Error", message, Color32::from_rgb(220, 53, 69));
                return;
            }
        };

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ChartPlotter::draw_kpis(ui, &view.kpis);
                ui.add_space(SECTION_SPACING);

                Self::section_title(ui, "1. Comparison of Permit Types");
                ChartPlotter::draw_comparison_chart(ui, &view.comparison);
                ui.add_space(SECTION_SPACING);

                Self::section_title(ui, "2 & 3. Composition Analysis");
                ui.columns(2, |columns| {
                    columns[0].label(RichText::new("Low Income Composition").strong());
                    ChartPlotter::draw_composition_chart(
                        &mut columns[0],
                        "low_composition",
                        &view.low_composition,
                        &LOW_PALETTE,
                    );
                    columns[1].label(RichText::new("High Income Composition").strong());
                    ChartPlotter::draw_composition_chart(
                        &mut columns[1],
                        "high_composition",
                        &view.high_composition,
                        &HIGH_PALETTE,
                    );
                });
                ui.add_space(SECTION_SPACING);

                Self::section_title(ui, "4. Cumulative Share (Essentials First)");
                ChartPlotter::draw_cumulative_chart(ui, &view.cumulative);
                ui.add_space(SECTION_SPACING);

                Self::section_title(ui, "5. Preference Gap (High - Low)");
                if view.gap.is_empty() {
                    ui.label(
                        RichText::new("No permit type differs noticeably between the groups.")
                            .color(Color32::GRAY),
                    );
                } else {
                    ChartPlotter::draw_gap_chart(ui, &view.gap);
                }
            });
    }

    fn section_title(ui: &mut egui::Ui, title: &str) {
        ui.label(RichText::new(title).size(18.0).strong());
        ui.add_space(6.0);
    }

    fn draw_banner(ui: &mut egui::Ui, title: &str, message: &str, color: Color32) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(2.0, color))
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.label(RichText::new(title).size(18.0).strong().color(color));
                ui.label(RichText::new(message).size(13.0));
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_hides_previous_view() {
        let mut viewer = ChartViewer::new();
        assert!(matches!(viewer.state(), ViewerState::Empty));
        viewer.set_warning("empty group");
        assert!(viewer.view().is_none());
        assert!(matches!(viewer.state(), ViewerState::Warning(m) if m == "empty group"));
    }
}
