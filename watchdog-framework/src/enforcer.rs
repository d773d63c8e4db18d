use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use watchdog_common::{Alert, StudentWarning, ViolationAction};
use watchdog_probes::{AlertSink, ProcessProbe};

use crate::WarningPublisher;

/// Counts of what one enforcement pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementReport {
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub warnings_published: usize,
    pub terminations_attempted: usize,
    pub terminations_failed: usize,
}

/// Carries out evaluator decisions. Every failure is logged and dropped.
pub struct Enforcer {
    alerts: Arc<dyn AlertSink>,
    probe: Arc<dyn ProcessProbe>,
    warnings: WarningPublisher,
}

impl Enforcer {
    pub fn new(
        alerts: Arc<dyn AlertSink>,
        probe: Arc<dyn ProcessProbe>,
        warnings: WarningPublisher,
    ) -> Self {
        Self {
            alerts,
            probe,
            warnings,
        }
    }

    pub async fn execute(&self, actions: &[ViolationAction]) -> EnforcementReport {
        let mut report = EnforcementReport::default();

        for action in actions {
            match action {
                ViolationAction::Alert { process } => {
                    let alert = Alert::forbidden_app(process, Utc::now());
                    match self.alerts.send(&alert).await {
                        Ok(()) => report.alerts_sent += 1,
                        Err(e) => {
                            warn!("Failed to deliver alert for {}: {}", process, e);
                            report.alerts_failed += 1;
                        }
                    }
                }
                ViolationAction::Warn { message, .. } => {
                    if self.warnings.publish(StudentWarning {
                        message: message.clone(),
                    }) {
                        report.warnings_published += 1;
                    }
                }
                ViolationAction::Terminate { process } => {
                    if !self.probe.supports_termination() {
                        continue;
                    }
                    report.terminations_attempted += 1;
                    match self.probe.terminate(process).await {
                        Ok(()) => info!("Terminated forbidden process {}", process),
                        Err(e) => {
                            debug!("Termination of {} failed: {}", process, e);
                            report.terminations_failed += 1;
                        }
                    }
                }
            }
        }

        report
    }
}
