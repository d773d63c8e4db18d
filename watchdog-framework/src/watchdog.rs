use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use watchdog_common::{LockPolicy, ViolationAction, WatchdogConfig};
use watchdog_probes::{host_probe, AlertSink, BackendClient, PolicySource, ProcessProbe};

use crate::{
    ComplianceEvaluator, EnforcementReport, Enforcer, FrameworkError, PolicyCache,
    ViolationCounters, WarningPublisher,
};

/// What a single tick ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous tick still held the state.
    Skipped,
    /// The watchdog has been stopped.
    Stopped,
    /// Process listing failed or was empty; nothing was enforced.
    NoSnapshot,
    Completed(TickReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub actions: Vec<ViolationAction>,
    pub enforcement: EnforcementReport,
}

struct WatchdogState {
    cache: PolicyCache,
    counters: ViolationCounters,
}

/// Process-compliance watchdog: fetch policy, list processes, evaluate, enforce.
pub struct Watchdog {
    source: Arc<dyn PolicySource>,
    probe: Arc<dyn ProcessProbe>,
    evaluator: ComplianceEvaluator,
    enforcer: Enforcer,
    interval: Duration,
    state: Mutex<WatchdogState>,
    stopped: AtomicBool,
}

impl Watchdog {
    pub fn new(
        config: &WatchdogConfig,
        source: Arc<dyn PolicySource>,
        alerts: Arc<dyn AlertSink>,
        probe: Arc<dyn ProcessProbe>,
        warnings: WarningPublisher,
    ) -> Self {
        let evaluator =
            ComplianceEvaluator::new(config.match_strategy, probe.supports_termination());
        Self {
            source,
            enforcer: Enforcer::new(alerts, probe.clone(), warnings),
            probe,
            evaluator,
            interval: config.poll_interval(),
            state: Mutex::new(WatchdogState {
                cache: PolicyCache::new(config.default_policy.clone()),
                counters: ViolationCounters::new(),
            }),
            stopped: AtomicBool::new(false),
        }
    }

    /// Wire the watchdog to the configured backend and the host process probe.
    pub fn from_config(
        config: &WatchdogConfig,
        warnings: WarningPublisher,
    ) -> Result<Self, FrameworkError> {
        config.validate()?;
        let backend = Arc::new(BackendClient::new(
            config.backend_url.clone(),
            config.request_timeout(),
        )?);
        let probe = host_probe(config.request_timeout());
        Ok(Self::new(config, backend.clone(), backend, probe, warnings))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one fetch, snapshot, evaluate, enforce pass.
    ///
    /// Non-reentrant: if another tick is in flight this returns
    /// [`TickOutcome::Skipped`] without touching any state.
    pub async fn tick(&self) -> TickOutcome {
        if self.is_stopped() {
            return TickOutcome::Stopped;
        }
        let Ok(mut guard) = self.state.try_lock() else {
            debug!("Previous tick still running, skipping");
            return TickOutcome::Skipped;
        };
        let state = &mut *guard;

        let policy = state.cache.refresh(self.source.as_ref()).await;

        let snapshot = match self.probe.snapshot().await {
            Ok(snapshot) if !snapshot.is_empty() => snapshot,
            Ok(_) => {
                warn!("Process listing came back empty, skipping enforcement this tick");
                return TickOutcome::NoSnapshot;
            }
            Err(e) => {
                warn!("Failed to list processes: {}. Skipping enforcement this tick", e);
                return TickOutcome::NoSnapshot;
            }
        };

        let actions = self.evaluator.evaluate(policy, &snapshot, &mut state.counters);
        for action in &actions {
            if let ViolationAction::Alert { process } = action {
                warn!(
                    "[FORBIDDEN] {}",
                    violation_summary(process, &actions, &state.counters, policy)
                );
            }
        }

        let enforcement = self.enforcer.execute(&actions).await;
        TickOutcome::Completed(TickReport {
            actions,
            enforcement,
        })
    }

    /// Prevent any further tick from starting. An in-flight tick runs to completion.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub async fn counters(&self) -> ViolationCounters {
        self.state.lock().await.counters.clone()
    }

    pub async fn effective_policy(&self) -> LockPolicy {
        self.state.lock().await.cache.current().clone()
    }

    /// Start ticking every [`Watchdog::interval`] on the current tokio runtime.
    pub fn spawn(self: Arc<Self>) -> WatchdogHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let watchdog = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(watchdog.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                "Process watchdog running every {:?} (match strategy {:?})",
                watchdog.interval,
                watchdog.evaluator.strategy()
            );

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                if watchdog.is_stopped() {
                    break;
                }
                match watchdog.tick().await {
                    TickOutcome::Completed(report) if !report.actions.is_empty() => {
                        debug!("Tick finished: {:?}", report.enforcement)
                    }
                    TickOutcome::Stopped => break,
                    _ => {}
                }
            }
            info!("Process watchdog stopped");
        });

        WatchdogHandle {
            watchdog: self,
            stop_tx,
            task,
        }
    }
}

/// Log line for one forbidden process after evaluation. Counters are already
/// reset for names terminated this tick, so those report the threshold instead.
fn violation_summary(
    process: &str,
    actions: &[ViolationAction],
    counters: &ViolationCounters,
    policy: &LockPolicy,
) -> String {
    let threshold = policy.effective_threshold();
    let terminating = actions
        .iter()
        .any(|a| matches!(a, ViolationAction::Terminate { process: p } if p == process));
    if terminating {
        format!(
            "{} is running (count={}, threshold={}), terminating",
            process, threshold, threshold
        )
    } else {
        format!(
            "{} is running (count={}, threshold={}, auto_kill={})",
            process,
            counters.get(process),
            threshold,
            policy.auto_kill()
        )
    }
}

/// Handle to a running watchdog task.
pub struct WatchdogHandle {
    watchdog: Arc<Watchdog>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchdogHandle {
    pub fn watchdog(&self) -> &Arc<Watchdog> {
        &self.watchdog
    }

    /// Stop ticking and wait for the loop to exit.
    pub async fn stop(self) {
        self.watchdog.stop();
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Watchdog task ended abnormally: {}", e);
        }
    }
}
