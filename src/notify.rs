//! Notification dispatch boundary.
//!
//! Every lifecycle side effect enqueues exactly one message keyed by event.
//! Dispatch is fire-and-forget: delivery guarantees and retries belong to the
//! external messaging collaborator, never to this crate. The engine only
//! promises that a committed transition enqueues its messages and a rolled
//! back one enqueues nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::subscription::model::Subscription;

/// Kind of subscriber notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Subscription activated; deliveries begin.
    Start,
    /// Cancellation requested; one final delivery remains.
    LastPeriod,
    /// Subscription is canceled.
    Cancellation,
    /// A renewal produced a new delivery order.
    Renewal,
    /// A renewal attempt failed; subscription paused.
    Failure,
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// What happened.
    pub kind: NotificationKind,
    /// Subscription the message concerns.
    pub subscription_number: String,
    /// When the triggering transition committed.
    pub occurred_at: DateTime<Utc>,
}

/// Outbound notification sink.
///
/// Implementations must not block and must not fail observably; a full or
/// closed downstream is the messaging collaborator's problem.
pub trait Notifier {
    /// Enqueues one message of `kind` for the subscription.
    fn notify(&self, kind: NotificationKind, subscription: &Subscription);
}

/// Discards every notification. Useful as default plumbing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _kind: NotificationKind, _subscription: &Subscription) {}
}

/// Notifier backed by an unbounded tokio channel.
///
/// The receiving half is handed to whatever worker delivers mail or webhooks.
/// Sending never blocks; if the receiver was dropped the message is silently
/// discarded, honoring fire-and-forget.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Creates the notifier and the receiver end of its queue.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, kind: NotificationKind, subscription: &Subscription) {
        let message = Notification {
            kind,
            subscription_number: subscription.number().to_owned(),
            occurred_at: Utc::now(),
        };
        if self.tx.send(message).is_err() {
            tracing::debug!(?kind, "notification receiver dropped, message discarded");
        }
    }
}

/// Records every notification for test assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: std::sync::Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds recorded so far, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().map_or_else(|_| Vec::new(), |sent| sent.iter().map(|n| n.kind).collect())
    }

    /// Number of messages of `kind` recorded.
    #[must_use]
    pub fn count_of(&self, kind: NotificationKind) -> usize {
        self.kinds().iter().filter(|k| **k == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, subscription: &Subscription) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(Notification {
                kind,
                subscription_number: subscription.number().to_owned(),
                occurred_at: Utc::now(),
            });
        }
    }
}

impl<N: Notifier> Notifier for &N {
    fn notify(&self, kind: NotificationKind, subscription: &Subscription) {
        (*self).notify(kind, subscription);
    }
}
