//! Blocking zip builder.

use std::fs::File;
use std::io;
use std::path::Path;

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::AssemblyError;

/// Zips everything under `source_dir` into `destination`, with entry names
/// relative to `source_dir`. Returns the archive size in bytes.
///
/// Runs synchronously; call it from a blocking thread.
pub(super) fn build_archive(source_dir: &Path, destination: &Path) -> Result<u64, AssemblyError> {
    let file = File::create(destination)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| AssemblyError::Archive(e.to_string()))?;
        let name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(name.as_str(), options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name.as_str(), options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    let file = zip.finish()?;
    Ok(file.metadata()?.len())
}
