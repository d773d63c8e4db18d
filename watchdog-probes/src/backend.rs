use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use watchdog_common::{Alert, LockPolicy};

use crate::{AlertSink, PolicySource, ProbeError};

pub const LOCK_CONFIG_PATH: &str = "/api/v1/config/lock";
pub const ALERTS_PATH: &str = "/api/v1/alerts";

/// HTTP client for the proctoring backend: serves the lock policy and collects alerts.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn lock_config_url(&self) -> String {
        format!("{}{}", self.base_url, LOCK_CONFIG_PATH)
    }

    pub fn alerts_url(&self) -> String {
        format!("{}{}", self.base_url, ALERTS_PATH)
    }

    fn transport_error(&self, what: &str, err: reqwest::Error) -> ProbeError {
        if err.is_timeout() {
            ProbeError::Timeout {
                what: what.to_string(),
                after: self.timeout,
            }
        } else {
            ProbeError::Http(err)
        }
    }
}

#[async_trait]
impl PolicySource for BackendClient {
    async fn fetch(&self) -> Result<LockPolicy, ProbeError> {
        let url = self.lock_config_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error("GET lock config", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status { status, url });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error("reading lock config", e))?;
        let policy: LockPolicy = serde_json::from_slice(&body)?;
        debug!(
            "Fetched lock policy: {} forbidden, {} allowed",
            policy.forbidden_apps.len(),
            policy.allowed_apps.len()
        );
        Ok(policy.normalized())
    }
}

#[async_trait]
impl AlertSink for BackendClient {
    async fn send(&self, alert: &Alert) -> Result<(), ProbeError> {
        let url = self.alerts_url();
        let response = self
            .client
            .post(&url)
            .json(alert)
            .send()
            .await
            .map_err(|e| self.transport_error("POST alert", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status { status, url });
        }
        Ok(())
    }
}
