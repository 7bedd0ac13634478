//! GUI module - User interface components

mod app;
mod chart_viewer;
mod control_panel;

pub use app::PermitGapApp;
pub use chart_viewer::{ChartViewer, ViewerState};
pub use control_panel::{set_selected, ControlPanel, ControlPanelAction};
