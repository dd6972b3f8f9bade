//! Periodic retention cleanup of job records and artifact files.

mod retention;

pub use retention::{RetentionSweeper, SweepReport};
