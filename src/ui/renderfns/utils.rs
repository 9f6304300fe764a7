use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::dashboard::LoadStatus;
use crate::notify::Severity;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Format an amount as dollars with thousands separators, e.g. `$1,234.50`
pub fn format_currency(amount: f64) -> String {
  let cents = (amount * 100.0).round() as i64;
  let sign = if cents < 0 { "-" } else { "" };
  let cents = cents.unsigned_abs();

  format!("{}${}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Format a count with thousands separators
pub fn format_count(n: u64) -> String {
  group_thousands(n)
}

fn group_thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// How long ago `updated_at` was, in the largest whole unit
pub fn format_age(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let secs = (now - updated_at).num_seconds().max(0);
  match secs {
    0..=59 => "just now".to_string(),
    60..=3_599 => format!("{}m ago", secs / 60),
    3_600..=86_399 => format!("{}h ago", secs / 3_600),
    _ => format!("{}d ago", secs / 86_400),
  }
}

/// Footer text for a dataset. Cached data carries its age so stale numbers are recognizable.
pub fn status_text(
  status: &LoadStatus,
  updated_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> String {
  match (status, updated_at) {
    (LoadStatus::OfflineCache | LoadStatus::FallbackCache, Some(at)) => {
      format!("{}, {}", status.label(), format_age(at, now))
    }
    _ => status.label().to_string(),
  }
}

/// Get the display color for a notification
pub fn severity_color(severity: Severity) -> Color {
  match severity {
    Severity::Info => Color::Cyan,
    Severity::Warning => Color::Yellow,
    Severity::Danger => Color::Red,
    Severity::Success => Color::Green,
  }
}

/// Get the display color for a dataset's load status
pub fn status_color(status: &LoadStatus) -> Color {
  match status {
    LoadStatus::Fresh => Color::Green,
    LoadStatus::OfflineCache | LoadStatus::FallbackCache => Color::Yellow,
    LoadStatus::NoOfflineData | LoadStatus::Failed(_) => Color::Red,
    LoadStatus::Idle | LoadStatus::Loading => Color::DarkGray,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Büromöbel und Stühle", 8), "Bürom...");
  }

  #[test]
  fn test_format_currency() {
    assert_eq!(format_currency(0.0), "$0.00");
    assert_eq!(format_currency(116.666), "$116.67");
    assert_eq!(format_currency(1234.5), "$1,234.50");
    assert_eq!(format_currency(1234567.0), "$1,234,567.00");
    assert_eq!(format_currency(-42.1), "-$42.10");
  }

  #[test]
  fn test_format_count() {
    assert_eq!(format_count(7), "7");
    assert_eq!(format_count(1000), "1,000");
    assert_eq!(format_count(123456), "123,456");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color(&LoadStatus::Fresh), Color::Green);
    assert_eq!(status_color(&LoadStatus::FallbackCache), Color::Yellow);
    assert_eq!(status_color(&LoadStatus::Failed("boom".into())), Color::Red);
  }

  #[test]
  fn test_format_age() {
    let now = Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
    assert_eq!(format_age(now, now), "just now");
    assert_eq!(format_age(now - Duration::seconds(59), now), "just now");
    assert_eq!(format_age(now - Duration::minutes(5), now), "5m ago");
    assert_eq!(format_age(now - Duration::minutes(150), now), "2h ago");
    assert_eq!(format_age(now - Duration::days(3), now), "3d ago");
    // Clock skew never shows a negative age
    assert_eq!(format_age(now + Duration::minutes(5), now), "just now");
  }

  #[test]
  fn test_status_text_shows_age_of_cached_data() {
    let now = Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap();
    let fetched = Some(now - Duration::hours(3));

    assert_eq!(
      status_text(&LoadStatus::OfflineCache, fetched, now),
      "offline cache, 3h ago"
    );
    assert_eq!(
      status_text(&LoadStatus::FallbackCache, fetched, now),
      "cached (server error), 3h ago"
    );
    assert_eq!(status_text(&LoadStatus::Fresh, fetched, now), "live");
    assert_eq!(
      status_text(&LoadStatus::OfflineCache, None, now),
      "offline cache"
    );
  }

  #[test]
  fn test_severity_color() {
    assert_eq!(severity_color(Severity::Danger), Color::Red);
    assert_eq!(severity_color(Severity::Success), Color::Green);
  }
}
