//! Progress parsing for external fetcher output.
//!
//! The fetcher writes human-oriented progress lines to stdout. This module
//! turns raw output chunks into structured [`JobProgress`] snapshots:
//!
//! - [`parse_line`] is a pure function recognising a single line.
//! - [`ProgressTracker`] buffers partial lines across chunk boundaries and
//!   merges per-item progress into the current playlist position.
//!
//! Lines that match no known pattern are ignored. An unrecognised format is
//! a missed update, never an error.

mod parser;
mod types;

pub use parser::{normalize_units, parse_line, ProgressLine, ProgressTracker};
pub use types::JobProgress;
