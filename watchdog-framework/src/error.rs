use thiserror::Error;

use watchdog_common::ConfigError;
use watchdog_probes::ProbeError;

#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
