use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, user, connectivity badge and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  user: &str,
  online: bool,
  forced_offline: bool,
  edit_mode: bool,
) {
  let (badge, badge_style) = connectivity_badge(online, forced_offline);

  let mut spans = vec![
    Span::styled(" saledash ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", user), Style::default().fg(Color::Yellow).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(badge, badge_style),
    Span::raw("  "),
  ];

  // Shortcuts - keys highlighted, descriptions dimmed
  let shortcuts: &[(&str, &str)] = if edit_mode {
    &[("<1>", " revenue/cogs"), ("<2>", " sales trend"), ("<e>", " done")]
  } else {
    &[
      ("<r>", " reload"),
      ("<e>", " edit"),
      ("<o>", " offline"),
      ("<x>", " clear cache"),
      ("<q>", " quit"),
    ]
  };
  for (key, label) in shortcuts {
    spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(*label, Style::default().fg(Color::DarkGray)));
    spans.push(Span::raw("   "));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

fn connectivity_badge(online: bool, forced_offline: bool) -> (&'static str, Style) {
  if forced_offline {
    (" OFFLINE (forced) ", Style::default().fg(Color::Black).bg(Color::Yellow))
  } else if online {
    (" ONLINE ", Style::default().fg(Color::Black).bg(Color::Green))
  } else {
    (" OFFLINE ", Style::default().fg(Color::White).bg(Color::Red))
  }
}
