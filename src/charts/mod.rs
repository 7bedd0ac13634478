//! Charts module - interactive dashboard charts and PNG export

mod plotter;
mod renderer;

pub use plotter::{ChartPlotter, AXIS_COLOR, HIGH_COLOR, HIGH_PALETTE, LOW_COLOR, LOW_PALETTE};
pub use renderer::{category_label, RenderError, StaticChartRenderer};
