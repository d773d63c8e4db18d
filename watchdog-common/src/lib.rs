pub mod action;
pub mod config;
pub mod policy;
pub mod process;

pub use action::{Alert, AlertKind, StudentWarning, ViolationAction};
pub use config::{ConfigError, WatchdogConfig};
pub use policy::{EnforcementPolicy, LockPolicy, MatchStrategy};
pub use process::ProcessSnapshot;
