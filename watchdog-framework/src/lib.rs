pub mod cache;
pub mod enforcer;
pub mod error;
pub mod evaluator;
pub mod warning;
pub mod watchdog;

pub use cache::PolicyCache;
pub use enforcer::{EnforcementReport, Enforcer};
pub use error::FrameworkError;
pub use evaluator::{ComplianceEvaluator, ViolationCounters};
pub use warning::WarningPublisher;
pub use watchdog::{TickOutcome, TickReport, Watchdog, WatchdogHandle};
