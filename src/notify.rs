//! Fire-and-forget user notifications.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Info,
  Warning,
  Danger,
  Success,
}

/// A short user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub severity: Severity,
  pub message: String,
}

/// Sending half of the notification surface.
///
/// Sending never fails for the caller: if nobody is listening any more the
/// message is only logged.
#[derive(Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  pub fn notify(&self, severity: Severity, message: impl Into<String>) {
    let message = message.into();
    match severity {
      Severity::Danger => tracing::error!(%message, "notification"),
      Severity::Warning => tracing::warn!(%message, "notification"),
      Severity::Info | Severity::Success => tracing::info!(%message, "notification"),
    }
    let _ = self.tx.send(Notification { severity, message });
  }

  pub fn info(&self, message: impl Into<String>) {
    self.notify(Severity::Info, message);
  }

  pub fn warning(&self, message: impl Into<String>) {
    self.notify(Severity::Warning, message);
  }

  pub fn danger(&self, message: impl Into<String>) {
    self.notify(Severity::Danger, message);
  }

  pub fn success(&self, message: impl Into<String>) {
    self.notify(Severity::Success, message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_messages_arrive_in_order() {
    let (notifier, mut rx) = Notifier::channel();
    notifier.info("one");
    notifier.danger("two");

    assert_eq!(
      rx.try_recv().unwrap(),
      Notification {
        severity: Severity::Info,
        message: "one".to_string()
      }
    );
    assert_eq!(rx.try_recv().unwrap().severity, Severity::Danger);
  }

  #[test]
  fn test_send_after_receiver_dropped_is_silent() {
    let (notifier, rx) = Notifier::channel();
    drop(rx);
    notifier.warning("nobody listening");
  }
}
