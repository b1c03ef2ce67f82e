//! Config file discovery.
//!
//! Each [`SearchPath`] becomes one or more directories, listed lowest priority
//! first. `Ancestors` expands to every directory from the filesystem root (or
//! the boundary marker) down to the start directory, so the deepest directory
//! wins. Each directory is then checked for `{dir}/{file_name}`; missing files
//! are skipped, other I/O errors are returned.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::FlagtreeError;
use crate::types::{Boundary, SearchMode, SearchPath};

/// Expand search paths into concrete directories, lowest priority first.
///
/// `start` is the directory `Cwd` and `Ancestors` resolve against; `None`
/// means the process working directory. Paths that cannot be resolved (no
/// home directory, say) are dropped.
pub fn search_dirs(
    search_paths: &[SearchPath],
    app_name: &str,
    start: Option<&Path>,
) -> Vec<PathBuf> {
    let start = start
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok());

    let mut dirs = Vec::new();
    for search_path in search_paths {
        match search_path {
            SearchPath::Platform => {
                if let Some(proj) = directories::ProjectDirs::from("", "", app_name) {
                    dirs.push(proj.config_dir().to_path_buf());
                }
            }
            SearchPath::Home(subdir) => {
                if let Some(user) = directories::UserDirs::new() {
                    dirs.push(user.home_dir().join(subdir));
                }
            }
            SearchPath::Cwd => dirs.extend(start.clone()),
            SearchPath::Path(path) => dirs.push(path.clone()),
            SearchPath::Ancestors(boundary) => {
                if let Some(start) = &start {
                    dirs.extend(ancestors(start, boundary));
                }
            }
        }
    }
    dirs
}

/// `start` and its parents, shallowest first, stopping (inclusively) at the
/// first directory holding the boundary marker.
fn ancestors(start: &Path, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for dir in start.ancestors() {
        dirs.push(dir.to_path_buf());
        if let Boundary::Marker(marker) = boundary
            && dir.join(marker).exists()
        {
            break;
        }
    }
    dirs.reverse();
    dirs
}

/// Find the config files to apply, lowest priority first.
///
/// [`Merge`](SearchMode::Merge) returns every file found;
/// [`FirstMatch`](SearchMode::FirstMatch) only the highest-priority one.
pub fn discover(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
    mode: SearchMode,
    start: Option<&Path>,
) -> Result<Vec<PathBuf>, FlagtreeError> {
    let candidates: Vec<PathBuf> = search_dirs(search_paths, app_name, start)
        .into_iter()
        .map(|dir| dir.join(file_name))
        .collect();

    let mut found = Vec::new();
    match mode {
        SearchMode::Merge => {
            for candidate in candidates {
                if exists(&candidate)? {
                    found.push(candidate);
                }
            }
        }
        SearchMode::FirstMatch => {
            for candidate in candidates.into_iter().rev() {
                if exists(&candidate)? {
                    found.push(candidate);
                    break;
                }
            }
        }
    }
    Ok(found)
}

fn exists(candidate: &Path) -> Result<bool, FlagtreeError> {
    match std::fs::metadata(candidate) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %candidate.display(), "config file not found, skipping");
            Ok(false)
        }
        Err(e) => Err(FlagtreeError::Io {
            path: candidate.to_path_buf(),
            source: e,
        }),
    }
}
