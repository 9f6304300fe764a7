mod panels;
mod renderfns;

use crate::app::App;
use crate::dashboard::{
  ChartKind, Dataset, LoadState, LoadStatus, RevenueCogs, SalesSummary, SalesTrend,
};
use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use tokio::sync::watch;

/// Width of the edit-mode sidebar
const SIDEBAR_WIDTH: u16 = 34;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let prefs = app.preferences();
  let edit_mode = prefs.edit_mode();

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(
    frame,
    chunks[0],
    app.title(),
    app.user(),
    app.is_online(),
    app.is_forced_offline(),
    edit_mode.is_edit_mode,
  );

  let main = if edit_mode.sidebar_visible {
    let split = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Min(1), Constraint::Length(SIDEBAR_WIDTH)])
      .split(chunks[1]);
    panels::draw_sidebar(frame, split[1], prefs.charts());
    split[0]
  } else {
    chunks[1]
  };
  draw_dashboard(frame, main, app);

  let feeds = app.feeds();
  let (summary, summary_at) = status_of(&feeds.summary);
  let (revenue_cogs, revenue_cogs_at) = status_of(&feeds.revenue_cogs);
  let (sales_trend, sales_trend_at) = status_of(&feeds.sales_trend);
  renderfns::draw_footer(
    frame,
    chunks[2],
    app.latest_notification(),
    &[
      (SalesSummary::LABEL, summary, summary_at),
      (RevenueCogs::LABEL, revenue_cogs, revenue_cogs_at),
      (SalesTrend::LABEL, sales_trend, sales_trend_at),
    ],
  );
}

fn status_of<T>(feed: &watch::Receiver<LoadState<T>>) -> (LoadStatus, Option<DateTime<Utc>>) {
  let state = feed.borrow();
  (state.status.clone(), state.updated_at)
}

fn draw_dashboard(frame: &mut Frame, area: Rect, app: &App) {
  let feeds = app.feeds();
  let charts = app.preferences().charts();
  let shown: Vec<ChartKind> = ChartKind::ALL
    .into_iter()
    .filter(|kind| charts.is_shown(*kind))
    .collect();

  let mut constraints = vec![Constraint::Length(3)]; // KPI cards
  if shown.is_empty() {
    constraints.push(Constraint::Min(1));
  } else {
    constraints.extend(shown.iter().map(|_| Constraint::Fill(1)));
  }
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints(constraints)
    .split(area);

  panels::draw_kpi_cards(frame, rows[0], &feeds.summary.borrow());

  if shown.is_empty() {
    let hint = Paragraph::new("No charts on the dashboard. Press 'e' to add some.")
      .alignment(Alignment::Center)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hint, rows[1]);
    return;
  }

  for (kind, row) in shown.iter().zip(rows.iter().skip(1)) {
    let state = match kind {
      ChartKind::RevenueCogs => feeds.revenue_cogs.borrow(),
      ChartKind::SalesTrend => feeds.sales_trend.borrow(),
    };
    panels::draw_chart(frame, *row, *kind, &state);
  }
}
