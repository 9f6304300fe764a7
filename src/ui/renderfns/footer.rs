use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::utils::{severity_color, status_color, status_text, truncate};
use crate::dashboard::LoadStatus;
use crate::notify::Notification;

/// Longest notification shown before truncating
const MAX_MESSAGE: usize = 80;

/// Draw the footer bar with the latest notification and each dataset's status.
///
/// `statuses` pairs each dataset name with its status and when its data was fetched.
pub fn draw_footer(
  frame: &mut Frame,
  area: Rect,
  notification: Option<&Notification>,
  statuses: &[(&str, LoadStatus, Option<DateTime<Utc>>)],
) {
  let now = Utc::now();
  let mut spans = vec![Span::raw(" ")];

  for (i, (name, status, updated_at)) in statuses.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" · ", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(format!("{}: ", name), Style::default().fg(Color::White)));
    spans.push(Span::styled(
      status_text(status, *updated_at, now),
      Style::default().fg(status_color(status)),
    ));
  }

  if let Some(notification) = notification {
    spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      truncate(&notification.message, MAX_MESSAGE),
      Style::default().fg(severity_color(notification.severity)).bold(),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
