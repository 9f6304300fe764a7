use ratatui::prelude::*;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Wrap};

use crate::dashboard::transform::{COGS, DAILY_SALES, REVENUE};
use crate::dashboard::{ChartKind, ChartSeries, LoadState, LoadStatus};
use crate::ui::renderfns::{status_color, truncate};

/// Longest category label under a bar group
const MAX_GROUP_LABEL: usize = 14;

/// Draw one chart panel, or a placeholder explaining why it is empty
pub fn draw_chart(frame: &mut Frame, area: Rect, kind: ChartKind, state: &LoadState<ChartSeries>) {
  let block = Block::default()
    .title(format!(" {} ", kind.title()))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(status_color(&state.status)));

  let chart = match &state.data {
    Some(chart) if !chart.is_empty() => chart,
    data => {
      let message = placeholder(data.is_some(), &state.status);
      let paragraph = Paragraph::new(message)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::DarkGray))
        .block(block);
      frame.render_widget(paragraph, area);
      return;
    }
  };

  let widget = match kind {
    ChartKind::RevenueCogs => revenue_cogs_chart(chart),
    ChartKind::SalesTrend => sales_trend_chart(chart),
  };
  frame.render_widget(widget.block(block), area);
}

fn placeholder(has_data: bool, status: &LoadStatus) -> String {
  if has_data {
    return "No sales in this period".to_string();
  }
  match status {
    LoadStatus::Idle | LoadStatus::Loading => "Loading...".to_string(),
    LoadStatus::NoOfflineData => "No offline data available".to_string(),
    LoadStatus::Failed(e) => format!("Failed to load: {}. Press 'r' to retry.", e),
    _ => "No data".to_string(),
  }
}

/// Grouped bars: revenue and COGS side by side per category
fn revenue_cogs_chart(chart: &ChartSeries) -> BarChart<'_> {
  let revenue = chart.values(REVENUE).unwrap_or(&[]);
  let cogs = chart.values(COGS).unwrap_or(&[]);

  let mut widget = BarChart::default().bar_width(7).bar_gap(1).group_gap(3);
  for (i, label) in chart.labels.iter().enumerate() {
    let bars = [
      bar(revenue.get(i).copied(), Color::Green),
      bar(cogs.get(i).copied(), Color::Red),
    ];
    widget = widget.data(
      BarGroup::default()
        .label(Line::from(truncate(label, MAX_GROUP_LABEL)))
        .bars(&bars),
    );
  }
  widget
}

fn sales_trend_chart(chart: &ChartSeries) -> BarChart<'_> {
  let values = chart.values(DAILY_SALES).unwrap_or(&[]);

  let bars: Vec<Bar> = chart
    .labels
    .iter()
    .enumerate()
    .map(|(i, date)| {
      // Dates are %Y-%m-%d; the year is noise on a 7 day chart
      let short = date.get(5..).unwrap_or(date);
      bar(values.get(i).copied(), Color::Cyan).label(Line::from(short.to_string()))
    })
    .collect();

  BarChart::default()
    .bar_width(7)
    .bar_gap(2)
    .data(BarGroup::default().bars(&bars))
}

fn bar(value: Option<f64>, color: Color) -> Bar<'static> {
  let value = value.unwrap_or(0.0);
  Bar::default()
    .value(value.max(0.0).round() as u64)
    .text_value(compact_amount(value))
    .style(Style::default().fg(color))
}

/// Short amount for bar captions, e.g. `1.2k`
fn compact_amount(amount: f64) -> String {
  let abs = amount.abs();
  if abs >= 1_000_000.0 {
    format!("{:.1}M", amount / 1_000_000.0)
  } else if abs >= 1_000.0 {
    format!("{:.1}k", amount / 1_000.0)
  } else {
    format!("{:.0}", amount)
  }
}
