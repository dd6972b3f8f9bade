//! Job records and the in-memory registry that owns them.

mod registry;
mod types;

pub use registry::{JobError, JobEvent, JobRegistry, NewJob};
pub use types::{Job, JobResult, JobStatus};
