//! Locating the yt-dlp executable.

use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

/// Resolves the fetcher binary.
///
/// Order: configured path, `<install>/bin/yt-dlp`, `<install>/yt-dlp`,
/// `~/.local/bin/yt-dlp`, then the bare name for a `PATH` lookup.
pub fn locate_binary(configured: Option<&Path>) -> PathBuf {
    let install_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from);

    resolve_binary(configured, install_dir.as_deref(), home.as_deref(), |p| {
        p.is_file()
    })
}

/// Resolution with injectable inputs.
pub fn resolve_binary(
    configured: Option<&Path>,
    install_dir: Option<&Path>,
    home: Option<&Path>,
    exists: impl Fn(&Path) -> bool,
) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }

    let name = binary_name();
    let mut candidates = Vec::new();
    if let Some(dir) = install_dir {
        candidates.push(dir.join("bin").join(&name));
        candidates.push(dir.join(&name));
    }
    if let Some(home) = home {
        candidates.push(home.join(".local").join("bin").join(&name));
    }

    candidates
        .into_iter()
        .find(|c| exists(c))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn binary_name() -> String {
    format!("yt-dlp{}", EXE_SUFFIX)
}
