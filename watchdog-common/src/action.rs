use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side effect decided by the compliance evaluator for one forbidden process.
///
/// Actions carry no timestamps: alerts are stamped when they are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationAction {
    /// Report to the remote alert collector.
    Alert { process: String },
    /// Push a message to the monitored user.
    Warn { process: String, message: String },
    /// Forcefully terminate every process with this image name.
    Terminate { process: String },
}

impl ViolationAction {
    pub fn alert(process: &str) -> Self {
        ViolationAction::Alert {
            process: process.to_string(),
        }
    }

    pub fn warn(process: &str) -> Self {
        ViolationAction::Warn {
            process: process.to_string(),
            message: StudentWarning::forbidden_app(process).message,
        }
    }

    pub fn terminate(process: &str) -> Self {
        ViolationAction::Terminate {
            process: process.to_string(),
        }
    }

    pub fn process(&self) -> &str {
        match self {
            ViolationAction::Alert { process }
            | ViolationAction::Warn { process, .. }
            | ViolationAction::Terminate { process } => process,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ForbiddenApp,
}

/// Payload posted to the alert collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub process: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn forbidden_app(process: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: AlertKind::ForbiddenApp,
            process: process.to_string(),
            timestamp,
        }
    }
}

/// Message pushed to the interactive surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentWarning {
    pub message: String,
}

impl StudentWarning {
    pub fn forbidden_app(process: &str) -> Self {
        Self {
            message: format!("Application \"{}\" is forbidden during the exam.", process),
        }
    }
}
