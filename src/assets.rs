//! Copies the static asset tree verbatim into the output tree.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Copies every file under `source` to the same relative location under
/// `destination` and returns the root-relative output paths (`/css/site.css`)
/// of the copied files. A missing `source` directory copies nothing.
pub fn publish(source: &Path, destination: &Path) -> Result<Vec<String>> {
    if !source.is_dir() {
        log::warn!("No static directory at {}; skipping assets", source.display());
        return Ok(Vec::new());
    }
    log::info!("Copy assets -> {}", destination.display());

    let mut copied = Vec::new();
    for result in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = result?;
        // strip_prefix shouldn't fail since `source` is always an ancestor
        // of the entry
        let relative = match entry.path().strip_prefix(source) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|err| Error::Io {
                path: target.clone(),
                err,
            })?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|err| Error::Io {
                path: entry.path().to_owned(),
                err,
            })?;
            copied.push(output_path(relative));
        }
    }
    Ok(copied)
}

fn output_path(relative: &Path) -> String {
    relative
        .components()
        .fold(String::new(), |mut out, component| {
            out.push('/');
            out.push_str(&component.as_os_str().to_string_lossy());
            out
        })
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure copying static assets.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when walking the static directory fails.
    #[error("walking static directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Returned when a file or directory can't be copied.
    #[error("copying `{}`: {err}", path.display())]
    Io { path: PathBuf, err: std::io::Error },
}
