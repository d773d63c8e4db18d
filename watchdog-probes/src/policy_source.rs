use async_trait::async_trait;
use watchdog_common::LockPolicy;

use crate::ProbeError;

/// Remote origin of the lock policy.
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Fetch the current policy. Any transport, status or decode failure is an error;
    /// callers keep their cached policy in that case.
    async fn fetch(&self) -> Result<LockPolicy, ProbeError>;
}
