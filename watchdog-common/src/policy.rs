use serde::{Deserialize, Serialize};

/// How a forbidden name is matched against a process listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Forbidden name appears anywhere in the listing text.
    #[default]
    Substring,
    /// Forbidden name equals a listed process name (or its final path component).
    Exact,
}

/// Enforcement settings attached to a lock policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementPolicy {
    #[serde(default)]
    pub auto_kill: bool,
    /// Raw value as configured. Use [`LockPolicy::effective_threshold`] when enforcing.
    #[serde(default)]
    pub repeat_threshold: Option<i64>,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self {
            auto_kill: false,
            repeat_threshold: Some(1),
        }
    }
}

/// Allow/forbidden application lists plus enforcement settings for an exam session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPolicy {
    /// Informational only, never enforced.
    #[serde(default)]
    pub allowed_apps: Vec<String>,
    #[serde(default)]
    pub forbidden_apps: Vec<String>,
    #[serde(default)]
    pub policy: EnforcementPolicy,
}

const BUILTIN_ALLOWED: &[&str] = &["explorer.exe", "proctor-desktop"];

const BUILTIN_FORBIDDEN: &[&str] = &[
    "chrome.exe",
    "firefox.exe",
    "msedge.exe",
    "discord",
    "teamviewer",
    "anydesk",
    "obs64.exe",
    "zoom",
];

impl LockPolicy {
    /// Policy in effect before the backend has ever answered.
    pub fn builtin() -> Self {
        Self {
            allowed_apps: BUILTIN_ALLOWED.iter().map(|s| s.to_string()).collect(),
            forbidden_apps: BUILTIN_FORBIDDEN.iter().map(|s| s.to_string()).collect(),
            policy: EnforcementPolicy {
                auto_kill: false,
                repeat_threshold: Some(3),
            },
        }
    }

    /// Lower-case and trim every name, drop empty entries and keep the first
    /// occurrence of duplicates. Order of the forbidden list is preserved.
    pub fn normalized(self) -> Self {
        Self {
            allowed_apps: normalize_names(self.allowed_apps),
            forbidden_apps: normalize_names(self.forbidden_apps),
            policy: self.policy,
        }
    }

    /// Repeat threshold clamped to at least 1.
    pub fn effective_threshold(&self) -> u32 {
        match self.policy.repeat_threshold {
            Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => 1,
        }
    }

    pub fn auto_kill(&self) -> bool {
        self.policy.auto_kill
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().to_lowercase();
        if name.is_empty() || out.contains(&name) {
            continue;
        }
        out.push(name);
    }
    out
}
