use futures_util::future::BoxFuture;
use tracing::debug;

use whisper_db::models::NotificationRow;

/// An external channel notifications are pushed to once they are persisted.
///
/// Delivery is best effort: the notifier logs a failed delivery and moves
/// on, the stored notifications stay.
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &'static str;

    fn deliver<'a>(&'a self, batch: &'a [NotificationRow]) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Placeholder for outbound email; only logs.
pub struct EmailStub;

impl DeliveryChannel for EmailStub {
    fn name(&self) -> &'static str {
        "email"
    }

    fn deliver<'a>(&'a self, batch: &'a [NotificationRow]) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            for n in batch {
                debug!(to = %n.to_user_id, kind = %n.kind, "email stub: would send notification");
            }
            Ok(())
        })
    }
}

/// Placeholder for mobile push; only logs.
pub struct PushStub;

impl DeliveryChannel for PushStub {
    fn name(&self) -> &'static str {
        "push"
    }

    fn deliver<'a>(&'a self, batch: &'a [NotificationRow]) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            debug!(count = batch.len(), "push stub: would push notifications");
            Ok(())
        })
    }
}
