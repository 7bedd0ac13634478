//! Permit Gap Main Application
//! Main window with control panel and chart viewer.

use crate::charts::StaticChartRenderer;
use crate::config::DashboardConfig;
use crate::data::{CsvDirectorySource, DataProcessor, DatasetCache, MergedDataset};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::stats::DashboardView;
use egui::SidePanel;
use std::sync::Arc;

/// Main application window.
pub struct PermitGapApp {
    config: DashboardConfig,
    cache: DatasetCache<CsvDirectorySource>,
    dataset: Option<Arc<MergedDataset>>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
}

impl PermitGapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let source = CsvDirectorySource::new(config.data_dir.clone());
        let cache = DatasetCache::new(source, config.loader()).with_ttl(config.cache_ttl());

        let mut app = Self {
            config,
            cache,
            dataset: None,
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
        };
        app.reload();
        app
    }

    /// Pull the dataset through the cache and, if it changed, reset the
    /// selections and redraw.
    fn reload(&mut self) {
        self.control_panel.data_dir = Some(self.cache.source().root().to_path_buf());

        match self.cache.get_or_load() {
            Ok(dataset) => {
                let fresh = self
                    .dataset
                    .as_ref()
                    .map_or(true, |current| !Arc::ptr_eq(current, &dataset));
                if fresh {
                    self.control_panel
                        .set_dataset(&dataset, &self.config.essential_types);
                    self.dataset = Some(dataset);
                    self.recompute();
                }
            }
            Err(e) => {
                log::error!("Failed to load permit data: {}", e);
                self.dataset = None;
                self.control_panel.clear_dataset();
                self.control_panel.set_status(format!("Error: {}", e));
                self.chart_viewer.set_error(e.to_string());
            }
        }
    }

    /// Rebuild the dashboard view for the current selection.
    fn recompute(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        let selection = &self.control_panel.selection;

        let result = DataProcessor::split_groups(dataset, selection)
            .and_then(|split| DashboardView::build(&split, selection, &self.config.view));

        match result {
            Ok(view) => {
                self.control_panel.set_status(format!(
                    "{} low / {} high income permits",
                    view.kpis.low_count, view.kpis.high_count
                ));
                self.control_panel.export_enabled = true;
                self.chart_viewer.set_view(view);
            }
            Err(e) if e.is_warning() => {
                log::warn!("{}", e);
                self.control_panel.set_status("Warning: empty group");
                self.control_panel.export_enabled = false;
                self.chart_viewer.set_warning(e.to_string());
            }
            Err(e) => {
                log::error!("Analysis failed: {}", e);
                self.control_panel.set_status(format!("Error: {}", e));
                self.control_panel.export_enabled = false;
                self.chart_viewer.set_error(e.to_string());
            }
        }
    }

    fn handle_refresh(&mut self) {
        self.cache.invalidate();
        self.dataset = None;
        self.reload();
    }

    fn handle_browse_data(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_directory(self.cache.source().root())
            .pick_folder()
        {
            log::info!("Switching data folder to {}", dir.display());
            self.cache.replace_source(CsvDirectorySource::new(dir));
            self.dataset = None;
            self.reload();
        }
    }

    fn handle_export_png(&mut self) {
        let Some(view) = self.chart_viewer.view() else {
            self.control_panel.set_status("No charts to export");
            return;
        };

        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };

        let renderer = StaticChartRenderer::new(self.config.export_width, self.config.export_height);
        match renderer.export_all(view, &dir) {
            Ok(files) => {
                self.control_panel
                    .set_status(format!("Exported {} charts to {}", files.len(), dir.display()));
                if let Err(e) = open::that(&dir) {
                    log::warn!("Could not open {}: {}", dir.display(), e);
                }
            }
            Err(e) => {
                log::error!("{}", e);
                self.control_panel.set_status(format!("Error: {}", e));
            }
        }
    }
}

impl eframe::App for PermitGapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.cache.is_expired() {
            self.reload();
        }
        if let Some(ttl) = self.config.cache_ttl() {
            ctx.request_repaint_after(ttl);
        }

        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::BrowseData => self.handle_browse_data(),
                        ControlPanelAction::Refresh => self.handle_refresh(),
                        ControlPanelAction::SelectionChanged => self.recompute(),
                        ControlPanelAction::ExportPng => self.handle_export_png(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
