//! Control Panel Widget
//! Left side panel with the data source, group selectors and cost filter.

use crate::data::{DataProcessor, FilterSelection, MergedDataset};
use egui::{Color32, RichText, ScrollArea};
use std::path::PathBuf;

/// Left side control panel.
pub struct ControlPanel {
    pub data_dir: Option<PathBuf>,
    pub income_categories: Vec<String>,
    pub permit_types: Vec<String>,
    pub selection: FilterSelection,
    /// Slider bounds; `None` when there is no valuation data worth filtering.
    pub cost_range: Option<(f64, f64)>,
    pub row_count: usize,
    pub unparsed_tracts: usize,
    pub status: String,
    pub export_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            data_dir: None,
            income_categories: Vec::new(),
            permit_types: Vec::new(),
            selection: FilterSelection::default(),
            cost_range: None,
            row_count: 0,
            unparsed_tracts: 0,
            status: "Ready".to_string(),
            export_enabled: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the option lists and reset selections for a newly loaded dataset.
    pub fn set_dataset(&mut self, dataset: &MergedDataset, essentials: &[String]) {
        self.income_categories = DataProcessor::income_categories(dataset);
        self.permit_types = DataProcessor::permit_types(dataset);
        self.cost_range = DataProcessor::cost_ceiling_range(DataProcessor::max_valuation(dataset));
        self.selection = DataProcessor::default_selection(dataset, essentials);
        self.row_count = dataset.height();
        self.unparsed_tracts = dataset.unparsed_tracts;
    }

    /// Forget the dataset after a failed load.
    pub fn clear_dataset(&mut self) {
        self.income_categories.clear();
        self.permit_types.clear();
        self.selection = FilterSelection::default();
        self.cost_range = None;
        self.row_count = 0;
        self.unparsed_tracts = 0;
        self.export_enabled = false;
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("LA Permit Analysis")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Low vs High Income Construction Patterns")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source =====
        ui.label(RichText::new("Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                let dir_text = self
                    .data_dir
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "No folder selected".to_string());
                ui.label(RichText::new(dir_text).size(12.0));
                ui.label(
                    RichText::new(format!("{} merged rows", self.row_count))
                        .size(11.0)
                        .color(Color32::GRAY),
                );
                if self.unparsed_tracts > 0 {
                    ui.label(
                        RichText::new(format!(
                            "{} permits with unreadable census tracts",
                            self.unparsed_tracts
                        ))
                        .size(11.0)
                        .color(Color32::from_rgb(255, 193, 7)),
                    );
                }

                ui.horizontal(|ui| {
                    if ui.button("Browse").clicked() {
                        action = ControlPanelAction::BrowseData;
                    }
                    if ui.button("Refresh").clicked() {
                        action = ControlPanelAction::Refresh;
                    }
                });
            });

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Group Definitions =====
        ui.label(RichText::new("Define Groups").size(14.0).strong());
        ui.add_space(5.0);

        ui.label("Low Income Categories:");
        if multi_select(
            ui,
            "low_categories",
            &self.income_categories,
            &mut self.selection.low_categories,
        ) {
            action = ControlPanelAction::SelectionChanged;
        }

        ui.add_space(5.0);
        ui.label("High Income Categories:");
        if multi_select(
            ui,
            "high_categories",
            &self.income_categories,
            &mut self.selection.high_categories,
        ) {
            action = ControlPanelAction::SelectionChanged;
        }

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Essentials =====
        ui.label(RichText::new("Define 'Essentials'").size(14.0).strong());
        ui.add_space(5.0);
        if multi_select(
            ui,
            "essential_types",
            &self.permit_types,
            &mut self.selection.essential_types,
        ) {
            action = ControlPanelAction::SelectionChanged;
        }

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Cost Filter =====
        ui.label(RichText::new("Cost Filter").size(14.0).strong());
        ui.add_space(5.0);
        match self.cost_range {
            Some((min, max)) => {
                let mut ceiling = self.selection.max_cost.unwrap_or(max);
                let response = ui.add(
                    egui::Slider::new(&mut ceiling, min..=max)
                        .text("Max Project Cost ($)")
                        .step_by(100.0),
                );
                if response.changed() {
                    self.selection.max_cost = Some(ceiling);
                    action = ControlPanelAction::SelectionChanged;
                }
            }
            None => {
                ui.label(
                    RichText::new("No valuation data, using full dataset")
                        .size(11.0)
                        .color(Color32::GRAY),
                );
            }
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Export =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.export_enabled, |ui| {
                let button = egui::Button::new(RichText::new("Export PNG Charts").size(14.0))
                    .min_size(egui::vec2(180.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportPng;
                }
            });
        });

        ui.add_space(10.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Warning") {
            Color32::from_rgb(255, 193, 7)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }
}

/// Checkbox list over `options`; returns true when `selected` changed.
fn multi_select(
    ui: &mut egui::Ui,
    id: &str,
    options: &[String],
    selected: &mut Vec<String>,
) -> bool {
    let mut changed = false;

    egui::Frame::none()
        .fill(ui.visuals().widgets.noninteractive.bg_fill)
        .rounding(5.0)
        .inner_margin(5.0)
        .show(ui, |ui| {
            ScrollArea::vertical()
                .id_salt(id)
                .max_height(120.0)
                .show(ui, |ui| {
                    for option in options {
                        let mut checked = selected.contains(option);
                        if ui.checkbox(&mut checked, option).changed() {
                            set_selected(selected, options, option, checked);
                            changed = true;
                        }
                    }
                });
        });

    ui.horizontal(|ui| {
        if ui.small_button("Select All").clicked() {
            *selected = options.to_vec();
            changed = true;
        }
        if ui.small_button("Clear All").clicked() {
            selected.clear();
            changed = true;
        }
    });

    changed
}

/// Add or remove `value`, keeping `selected` in `options` order.
pub fn set_selected(selected: &mut Vec<String>, options: &[String], value: &str, on: bool) {
    if on {
        if !selected.iter().any(|s| s == value) {
            selected.push(value.to_string());
        }
        selected.sort_by_key(|s| options.iter().position(|o| o == s).unwrap_or(usize::MAX));
    } else {
        selected.retain(|s| s != value);
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseData,
    Refresh,
    SelectionChanged,
    ExportPng,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn set_selected_keeps_option_order() {
        let options = strings(&["Electrical", "HVAC", "Plumbing"]);
        let mut selected = strings(&["Plumbing"]);

        set_selected(&mut selected, &options, "Electrical", true);
        assert_eq!(selected, strings(&["Electrical", "Plumbing"]));

        set_selected(&mut selected, &options, "Electrical", true);
        assert_eq!(selected.len(), 2);

        set_selected(&mut selected, &options, "Plumbing", false);
        assert_eq!(selected, strings(&["Electrical"]));
    }

    #[test]
    fn clear_dataset_resets_selection() {
        let mut panel = ControlPanel::new();
        panel.selection.low_categories = strings(&["Low Income"]);
        panel.row_count = 10;
        panel.export_enabled = true;
        panel.clear_dataset();
        assert_eq!(panel.selection, FilterSelection::default());
        assert_eq!(panel.row_count, 0);
        assert!(!panel.export_enabled);
    }
}
