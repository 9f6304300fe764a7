use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::notify::Notification;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized; redraw
  Resize,
  /// Periodic tick so loader state changes get drawn
  Tick,
  /// A user-facing notification from a loader or the preference store
  Notification(Notification),
}

/// Merges terminal input, a tick timer and notifications into one stream
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // crossterm polling blocks, keep it off the async workers
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      let event = match event::poll(tick_rate) {
        Ok(true) => match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
          Ok(CrosstermEvent::Resize(..)) => Event::Resize,
          Ok(_) => continue,
          Err(e) => {
            tracing::warn!(error = %e, "terminal read failed");
            continue;
          }
        },
        Ok(false) => Event::Tick,
        Err(e) => {
          tracing::error!(error = %e, "terminal poll failed, stopping input");
          break;
        }
      };
      if input_tx.send(event).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Forward every notification into the event stream
  pub fn forward_notifications(&self, mut notifications: mpsc::UnboundedReceiver<Notification>) {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      while let Some(notification) = notifications.recv().await {
        if tx.send(Event::Notification(notification)).is_err() {
          break;
        }
      }
    });
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
