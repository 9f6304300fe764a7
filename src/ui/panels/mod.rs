mod charts;
mod kpi_cards;
mod sidebar;

pub use charts::draw_chart;
pub use kpi_cards::draw_kpi_cards;
pub use sidebar::draw_sidebar;
