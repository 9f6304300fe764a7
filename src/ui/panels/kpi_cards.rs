use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::dashboard::{DashboardAggregate, LoadState};
use crate::ui::renderfns::{format_count, format_currency, status_color};

/// Draw the four headline KPI cards side by side
pub fn draw_kpi_cards(frame: &mut Frame, area: Rect, state: &LoadState<DashboardAggregate>) {
  let cards = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Ratio(1, 4); 4])
    .split(area);

  let border = Style::default().fg(status_color(&state.status));

  for (card, (title, value)) in cards.iter().zip(card_values(state.data.as_ref())) {
    let block = Block::default()
      .title(format!(" {} ", title))
      .borders(Borders::ALL)
      .border_style(border);

    let paragraph = Paragraph::new(value)
      .alignment(Alignment::Center)
      .style(Style::default().fg(Color::White).bold())
      .block(block);
    frame.render_widget(paragraph, *card);
  }
}

fn card_values(data: Option<&DashboardAggregate>) -> [(&'static str, String); 4] {
  let value = |f: fn(&DashboardAggregate) -> String| data.map(f).unwrap_or_else(|| "-".to_string());

  [
    ("Total Orders", value(|d| format_count(d.total_orders))),
    ("Total Revenue", value(|d| format_currency(d.total_revenue))),
    ("Orders Today", value(|d| format_count(d.orders_today))),
    ("Avg Order Value", value(|d| format_currency(d.average_order_value))),
  ]
}
