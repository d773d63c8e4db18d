use std::collections::HashMap;

use watchdog_common::{LockPolicy, MatchStrategy, ProcessSnapshot, ViolationAction};

/// Per forbidden name, number of violating ticks seen since the last termination.
///
/// Entries are never decremented when a name is absent from a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationCounters {
    counts: HashMap<String, u32>,
}

impl ViolationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// True when no name has an outstanding violation. Names reset by a
    /// termination keep an entry at zero.
    pub fn all_zero(&self) -> bool {
        self.counts.values().all(|&c| c == 0)
    }

    fn bump(&mut self, name: &str) -> u32 {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    fn reset(&mut self, name: &str) {
        self.counts.insert(name.to_string(), 0);
    }
}

/// Decides which actions a tick must take for a given policy and snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceEvaluator {
    strategy: MatchStrategy,
    termination_supported: bool,
}

impl ComplianceEvaluator {
    pub fn new(strategy: MatchStrategy, termination_supported: bool) -> Self {
        Self {
            strategy,
            termination_supported,
        }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Evaluate one tick. The only state touched is `counters`.
    ///
    /// Forbidden names are visited in policy order. Every match yields an alert and a
    /// warning; with auto-kill on a supporting platform the counter is bumped and a
    /// termination is emitted once it reaches the threshold, resetting it to zero.
    pub fn evaluate(
        &self,
        policy: &LockPolicy,
        snapshot: &ProcessSnapshot,
        counters: &mut ViolationCounters,
    ) -> Vec<ViolationAction> {
        let mut actions = Vec::new();
        if snapshot.is_empty() {
            return actions;
        }

        let enforce = policy.auto_kill() && self.termination_supported;
        let threshold = policy.effective_threshold();

        for name in &policy.forbidden_apps {
            if name.is_empty() || !snapshot.matches(name, self.strategy) {
                continue;
            }

            actions.push(ViolationAction::alert(name));
            actions.push(ViolationAction::warn(name));

            if enforce && counters.bump(name) >= threshold {
                actions.push(ViolationAction::terminate(name));
                counters.reset(name);
            }
        }

        actions
    }
}
