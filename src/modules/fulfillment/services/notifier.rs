use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PurchaseConfirmed,
    PaymentRefunded,
}

/// Outbound notification collaborator
///
/// Fire-and-forget from the core's perspective: callers log failures and never let
/// them block a payment-status transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: &serde_json::Value,
    ) -> Result<()>;
}

/// Default implementation that records deliveries in the log stream
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: &serde_json::Value,
    ) -> Result<()> {
        info!(kind = ?kind, recipient = %recipient, payload = %payload, "Dispatching notification");
        Ok(())
    }
}
