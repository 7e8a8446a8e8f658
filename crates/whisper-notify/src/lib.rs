pub mod delivery;

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use whisper_db::models::NotificationRow;
use whisper_db::{Database, FanOut};

use crate::delivery::{DeliveryChannel, EmailStub, PushStub};

/// Turns committed lifecycle events into stored notifications and hands them
/// to the delivery channels.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    db: Arc<Database>,
    channels: Vec<Arc<dyn DeliveryChannel>>,
}

/// Unique candidates in first-seen order, without the actor or blank ids.
pub fn recipients(candidates: &[String], actor_id: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .map(String::as_str)
        .filter(|id| !id.is_empty() && *id != actor_id)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

impl Notifier {
    /// Notifier with the stock email and push stubs.
    pub fn new(db: Arc<Database>) -> Self {
        let channels: Vec<Arc<dyn DeliveryChannel>> = vec![Arc::new(EmailStub), Arc::new(PushStub)];
        Self::with_channels(db, channels)
    }

    pub fn with_channels(db: Arc<Database>, channels: Vec<Arc<dyn DeliveryChannel>>) -> Self {
        Self {
            inner: Arc::new(NotifierInner { db, channels }),
        }
    }

    /// Persist and deliver the notifications for one committed event.
    ///
    /// Never fails: the triggering command has already committed, so storage
    /// and delivery errors are logged and an empty or partial result returned.
    pub async fn fan_out(&self, fan_out: FanOut) -> Vec<NotificationRow> {
        let targets = recipients(&fan_out.candidates, &fan_out.actor_id);
        let kind = fan_out.kind;

        if targets.is_empty() {
            debug!(%kind, prayer_id = %fan_out.prayer_request_id, "No recipients, skipping fan-out");
            return vec![];
        }

        let db = self.inner.db.clone();
        let persisted = tokio::task::spawn_blocking(move || {
            db.insert_notifications(
                &targets,
                fan_out.kind,
                &fan_out.prayer_request_id,
                &fan_out.text,
            )
        })
        .await;

        let rows = match persisted {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                error!(%kind, "Failed to store notifications: {}", e);
                return vec![];
            }
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                return vec![];
            }
        };

        info!(%kind, count = rows.len(), "Notifications stored");
        self.deliver(&rows).await;
        rows
    }

    /// Run every channel concurrently and swallow their failures.
    async fn deliver(&self, rows: &[NotificationRow]) {
        let results = join_all(
            self.inner
                .channels
                .iter()
                .map(|channel| async move { (channel.name(), channel.deliver(rows).await) }),
        )
        .await;

        for (channel, result) in results {
            if let Err(e) = result {
                warn!(channel, "Notification delivery failed: {}", e);
            }
        }
    }
}
