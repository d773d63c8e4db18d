pub mod alert;
pub mod backend;
pub mod error;
pub mod policy_source;
pub mod process;

pub use alert::AlertSink;
pub use backend::BackendClient;
pub use error::ProbeError;
pub use policy_source::PolicySource;
pub use process::{
    host_probe, list_processes, parse_ps_entries, parse_tasklist_entries, ProcessEntry,
    ProcessProbe, PsProbe, TasklistProbe,
};
