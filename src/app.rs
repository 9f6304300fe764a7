use crate::cache::CacheStore;
use crate::connectivity::ConnectivityMonitor;
use crate::dashboard::{
  ChartKind, ChartSeries, DashboardAggregate, LoadState, LoaderContext, PreferenceStore,
  ReloadTrigger,
};
use crate::event::{Event, EventHandler};
use crate::notify::{Notification, Notifier};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::collections::VecDeque;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// Notifications kept for display
const NOTIFICATION_HISTORY: usize = 20;

/// Live views of the three dataset loaders
pub struct Feeds {
  pub summary: watch::Receiver<LoadState<DashboardAggregate>>,
  pub revenue_cogs: watch::Receiver<LoadState<ChartSeries>>,
  pub sales_trend: watch::Receiver<LoadState<ChartSeries>>,
}

/// Main application state
pub struct App {
  /// Header title
  title: String,

  /// Who the dashboard is scoped to
  user: String,

  feeds: Feeds,

  preferences: PreferenceStore,

  cache: CacheStore,
  connectivity: ConnectivityMonitor,
  notifier: Notifier,

  /// Reload requests fan out to every loader
  triggers: broadcast::Sender<ReloadTrigger>,

  /// Most recent first
  notifications: VecDeque<Notification>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(
    title: String,
    user: String,
    feeds: Feeds,
    preferences: PreferenceStore,
    ctx: &LoaderContext,
    triggers: broadcast::Sender<ReloadTrigger>,
  ) -> Self {
    Self {
      title,
      user,
      feeds,
      preferences,
      cache: ctx.cache.clone(),
      connectivity: ctx.connectivity.clone(),
      notifier: ctx.notifier.clone(),
      triggers,
      notifications: VecDeque::new(),
      should_quit: false,
    }
  }

  pub async fn run(&mut self, notifications: mpsc::UnboundedReceiver<Notification>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    events.forward_notifications(notifications);

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event).await,
        None => break,
      }
    }
    Ok(())
  }

  async fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key).await,
      Event::Notification(notification) => self.push_notification(notification),
      Event::Tick | Event::Resize => {} // Redraw happens on the next loop turn
    }
  }

  fn push_notification(&mut self, notification: Notification) {
    self.notifications.push_front(notification);
    self.notifications.truncate(NOTIFICATION_HISTORY);
  }

  async fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      KeyCode::Char('r') => self.reload(),
      KeyCode::Char('o') => self.toggle_forced_offline(),
      KeyCode::Char('x') => self.clear_cache().await,

      KeyCode::Char('e') => self.preferences.toggle_edit_mode().await,
      KeyCode::Esc if self.preferences.edit_mode().is_edit_mode => {
        self.preferences.close_sidebar().await;
      }
      KeyCode::Char('1') => self.toggle_chart(ChartKind::RevenueCogs).await,
      KeyCode::Char('2') => self.toggle_chart(ChartKind::SalesTrend).await,

      _ => {}
    }
  }

  fn reload(&self) {
    // No receivers only happens during shutdown
    let _ = self.triggers.send(ReloadTrigger::Manual);
  }

  fn toggle_forced_offline(&self) {
    let forced = !self.connectivity.is_forced_offline();
    self.connectivity.set_forced_offline(forced);
    if forced {
      self.notifier.warning("Working offline");
    } else {
      self.notifier.info("Offline override lifted");
    }
  }

  async fn clear_cache(&self) {
    match self.cache.clear_all().await {
      Ok(()) => self.notifier.info("Offline data cleared"),
      Err(e) => {
        tracing::error!(error = %e, "failed to clear cache");
        self.notifier.danger("Could not clear offline data");
      }
    }
  }

  /// Charts can only be placed while editing the layout
  async fn toggle_chart(&mut self, kind: ChartKind) {
    if !self.preferences.edit_mode().is_edit_mode {
      return;
    }
    if self.preferences.charts().is_shown(kind) {
      self.preferences.remove_chart(kind).await;
    } else {
      self.preferences.add_chart(kind).await;
    }
  }

  // Accessors for UI rendering
  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn user(&self) -> &str {
    &self.user
  }

  pub fn is_online(&self) -> bool {
    self.connectivity.is_online()
  }

  pub fn is_forced_offline(&self) -> bool {
    self.connectivity.is_forced_offline()
  }

  pub fn feeds(&self) -> &Feeds {
    &self.feeds
  }

  pub fn preferences(&self) -> &PreferenceStore {
    &self.preferences
  }

  pub fn latest_notification(&self) -> Option<&Notification> {
    self.notifications.front()
  }
}
