// # Notifier Trait
//
// Outbound delivery of notifications. The engine only ever sees this trait;
// the webhook implementation lives in [`crate::notify::WebhookNotifier`].

use crate::notify::Notification;
use async_trait::async_trait;

/// Delivers one notification per call
///
/// Delivery is best effort. Failures are reported as `false` and logged by
/// the implementation; they never propagate into the synchronization pass.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a notification
    ///
    /// # Returns
    ///
    /// `true` if the receiving endpoint accepted it
    async fn send(&self, notification: &Notification) -> bool;
}
