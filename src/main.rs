//! Permit Gap - LA permit analysis dashboard
//!
//! Desktop viewer comparing low and high income construction patterns.

use eframe::egui;
use permit_gap::config::DashboardConfig;
use permit_gap::gui::PermitGapApp;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::discover()?;
    log::info!(
        "Reading {} and {} from {}",
        config.permits_table,
        config.census_table,
        config.data_dir.display()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("LA Permit Analysis"),
        ..Default::default()
    };

    eframe::run_native(
        "LA Permit Analysis",
        options,
        Box::new(|cc| Ok(Box::new(PermitGapApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start dashboard: {}", e))
}
