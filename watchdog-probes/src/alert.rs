use async_trait::async_trait;
use watchdog_common::Alert;

use crate::ProbeError;

/// Remote collector for violation alerts. Delivery is best effort.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), ProbeError>;
}
