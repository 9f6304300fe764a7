use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem};

use crate::dashboard::{ChartKind, ChartVisibility};

/// Draw the edit-mode sidebar listing every chart and whether it is placed
pub fn draw_sidebar(frame: &mut Frame, area: Rect, charts: ChartVisibility) {
  let items: Vec<ListItem> = ChartKind::ALL
    .iter()
    .enumerate()
    .map(|(i, kind)| {
      let (mark, style) = if charts.is_shown(*kind) {
        ("[x]", Style::default().fg(Color::Green))
      } else {
        ("[ ]", Style::default().fg(Color::DarkGray))
      };
      ListItem::new(Line::from(vec![
        Span::styled(format!("<{}> ", i + 1), Style::default().fg(Color::Cyan)),
        Span::styled(format!("{} {}", mark, kind.title()), style),
      ]))
    })
    .collect();

  let list = List::new(items).block(
    Block::default()
      .title(" Available Charts ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow)),
  );

  frame.render_widget(list, area);
}
