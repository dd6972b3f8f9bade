//! Turns a finished working directory into a public artifact.
//!
//! One output file is moved as-is into the artifacts area; several are
//! zipped into `playlist_<job id>.zip`. Either way the working directory
//! is gone once assembly succeeds.

mod archive;
mod error;
mod result_assembler;
mod types;

pub use error::AssemblyError;
pub use result_assembler::ResultAssembler;
pub use types::{archive_name, Artifact, AssemblyPlan};
