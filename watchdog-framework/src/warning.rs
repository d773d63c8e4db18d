use log::debug;
use tokio::sync::broadcast;
use watchdog_common::StudentWarning;

const DEFAULT_CAPACITY: usize = 64;

/// One-way push channel to whatever surface shows warnings to the monitored user.
///
/// Publishing never waits. With no subscriber the warning is dropped.
#[derive(Debug, Clone)]
pub struct WarningPublisher {
    tx: broadcast::Sender<StudentWarning>,
}

impl WarningPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudentWarning> {
        self.tx.subscribe()
    }

    /// Returns whether at least one subscriber received the warning.
    pub fn publish(&self, warning: StudentWarning) -> bool {
        match self.tx.send(warning) {
            Ok(_) => true,
            Err(_) => {
                debug!("No warning subscriber, dropping message");
                false
            }
        }
    }
}

impl Default for WarningPublisher {
    fn default() -> Self {
        Self::new()
    }
}
