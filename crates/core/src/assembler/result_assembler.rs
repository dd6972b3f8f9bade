//! Result assembler implementation.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use super::archive::build_archive;
use super::error::AssemblyError;
use super::types::{archive_name, Artifact, AssemblyPlan};

/// Moves or archives job output into the public artifacts area.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    artifacts_dir: PathBuf,
}

impl ResultAssembler {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Inspects the top level of `working_dir` and decides how to assemble it.
    pub async fn plan(&self, working_dir: &Path) -> Result<AssemblyPlan, AssemblyError> {
        let mut entries = fs::read_dir(working_dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }

        Ok(match paths.len() {
            0 => AssemblyPlan::Empty,
            1 => {
                let path = paths.remove(0);
                if fs::metadata(&path).await?.is_file() {
                    AssemblyPlan::Single(path)
                } else {
                    AssemblyPlan::Archive { entries: 1 }
                }
            }
            n => AssemblyPlan::Archive { entries: n },
        })
    }

    /// Carries out `plan`, then removes `working_dir`.
    ///
    /// Never retried: on failure the caller marks the job as failed.
    pub async fn execute(
        &self,
        job_id: &str,
        working_dir: &Path,
        plan: AssemblyPlan,
    ) -> Result<Artifact, AssemblyError> {
        let artifact = match plan {
            AssemblyPlan::Empty => return Err(AssemblyError::NoOutput),
            AssemblyPlan::Single(source) => self.relocate(job_id, &source).await?,
            AssemblyPlan::Archive { entries } => {
                info!("Archiving {} entries for job {}", entries, job_id);
                self.archive(job_id, working_dir).await?
            }
        };

        if let Err(e) = fs::remove_dir_all(working_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove working directory {:?}: {}", working_dir, e);
            }
        }

        info!(
            "Assembled {} ({} bytes) for job {}",
            artifact.filename, artifact.size_bytes, job_id
        );
        Ok(artifact)
    }

    /// Publishes the single output under its own name, or under a
    /// job-qualified name when another job already published that name.
    /// Existing artifacts are never replaced.
    async fn relocate(&self, job_id: &str, source: &Path) -> Result<Artifact, AssemblyError> {
        let filename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| AssemblyError::Archive(format!("invalid file name: {:?}", source)))?;

        for candidate in [filename.clone(), qualified_name(&filename, job_id)] {
            let destination = self.artifacts_dir.join(&candidate);
            let published = publish_no_clobber(source, &destination)
                .await
                .map_err(|e| AssemblyError::move_failed(source.to_path_buf(), destination.clone(), e))?;

            if !published {
                debug!("{:?} already taken, trying another name", destination);
                continue;
            }

            let size_bytes = fs::metadata(&destination).await?.len();
            return Ok(Artifact {
                filename: candidate,
                path: destination,
                size_bytes,
                archived: false,
            });
        }

        Err(AssemblyError::move_failed(
            source.to_path_buf(),
            self.artifacts_dir.join(&filename),
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "every candidate artifact name is taken",
            ),
        ))
    }

    async fn archive(&self, job_id: &str, working_dir: &Path) -> Result<Artifact, AssemblyError> {
        let filename = archive_name(job_id);
        let destination = self.artifacts_dir.join(&filename);

        let source = working_dir.to_path_buf();
        let target = destination.clone();
        let built = tokio::task::spawn_blocking(move || build_archive(&source, &target))
            .await
            .map_err(|e| AssemblyError::Archive(format!("archive task failed: {}", e)))
            .and_then(|result| result);

        match built {
            Ok(size_bytes) => Ok(Artifact {
                filename,
                path: destination,
                size_bytes,
                archived: true,
            }),
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&destination).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove partial archive {:?}: {}", destination, remove_err);
                    }
                }
                Err(e)
            }
        }
    }
}

/// `Intro.mp4` -> `Intro_<job id>.mp4`.
fn qualified_name(filename: &str, job_id: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, job_id, ext.to_string_lossy()),
        None => format!("{}_{}", stem, job_id),
    }
}

fn is_cross_device(e: &std::io::Error) -> bool {
    // EXDEV is 18 on Linux
    e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}

/// Moves `source` to `destination` unless `destination` exists.
///
/// A hard link claims the name atomically; when linking is not possible
/// (another filesystem, or no link support) the bytes are copied into a file
/// created with `create_new`. Returns `Ok(false)` if the name is taken.
async fn publish_no_clobber(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
    match fs::hard_link(source, destination).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) if is_cross_device(&e) || e.kind() == std::io::ErrorKind::Unsupported => {
            debug!("Cannot link {:?}, copying to {:?}", source, destination);
            if !copy_new(source, destination).await? {
                return Ok(false);
            }
        }
        Err(e) => return Err(e),
    }

    fs::remove_file(source).await?;
    Ok(true)
}

async fn copy_new(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
    let mut target = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };

    let copied = async {
        let mut input = fs::File::open(source).await?;
        tokio::io::copy(&mut input, &mut target).await?;
        target.sync_all().await
    }
    .await;

    if let Err(e) = copied {
        drop(target);
        let _ = fs::remove_file(destination).await;
        return Err(e);
    }
    Ok(true)
}
