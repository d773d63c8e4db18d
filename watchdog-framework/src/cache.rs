use chrono::{DateTime, Utc};
use log::{info, warn};
use watchdog_common::LockPolicy;
use watchdog_probes::PolicySource;

/// Last known-good lock policy.
///
/// Seeded with a fallback policy so there is always something to enforce.
#[derive(Debug, Clone)]
pub struct PolicyCache {
    current: LockPolicy,
    last_success: Option<DateTime<Utc>>,
}

impl PolicyCache {
    pub fn new(fallback: LockPolicy) -> Self {
        Self {
            current: fallback.normalized(),
            last_success: None,
        }
    }

    pub fn current(&self) -> &LockPolicy {
        &self.current
    }

    /// When the backend last answered, `None` while still on the fallback policy.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    /// Fetch from `source`, replacing the cached policy on success.
    /// Returns the policy to enforce this tick either way.
    pub async fn refresh(&mut self, source: &dyn PolicySource) -> &LockPolicy {
        match source.fetch().await {
            Ok(policy) => {
                if policy != self.current {
                    info!(
                        "Lock policy updated: {} forbidden app(s), auto_kill={}, threshold={}",
                        policy.forbidden_apps.len(),
                        policy.auto_kill(),
                        policy.effective_threshold()
                    );
                }
                self.current = policy;
                self.last_success = Some(Utc::now());
            }
            Err(e) => match self.last_success {
                Some(at) => warn!(
                    "Failed to fetch lock policy: {}. Keeping policy fetched at {}",
                    e,
                    at.to_rfc3339()
                ),
                None => warn!("Failed to fetch lock policy: {}. Using built-in policy", e),
            },
        }
        &self.current
    }
}
