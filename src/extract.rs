//! Extracts a [`Record`] from a source document. Only files with the markdown
//! extension are buildable, and editor lock files (`.#name.md`) are skipped.
//! The document's front matter is obtained from the renderer's metadata mode
//! and must look like:
//!
//! ```yaml
//! title: Hello, world!
//! date: 2021/04/16
//! tags: [greet]
//! ```
//!
//! `title` and `date` are required, `tags` is optional.

use crate::record::{self, Record};
use crate::render::{self, Renderer};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MARKDOWN_EXTENSION: &str = "md";

/// The prefix of the lock files emacs leaves next to files being edited.
pub const LOCK_FILE_MARKER: &str = ".#";

/// Returns whether `path` names a buildable source document.
pub fn is_source(path: &Path) -> bool {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    !file_name.starts_with(LOCK_FILE_MARKER)
        && path.extension().and_then(|e| e.to_str()) == Some(MARKDOWN_EXTENSION)
}

#[derive(Deserialize)]
struct Frontmatter {
    #[serde(default, alias = "Title")]
    title: Option<String>,

    #[serde(default, alias = "Date")]
    date: Option<String>,

    #[serde(default, alias = "Tags")]
    tags: Option<Vec<String>>,
}

/// Extracts the [`Record`] for the source document at `path`. The category is
/// the name of the directory containing the document.
pub fn extract(renderer: &dyn Renderer, path: &Path) -> Result<Record> {
    let invalid_path = || Error::InvalidPath(path.to_owned());
    let basename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(invalid_path)?;
    let category = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .ok_or_else(invalid_path)?;

    let metadata = renderer.metadata(path).map_err(|err| Error::Render {
        path: path.to_owned(),
        err,
    })?;
    // an empty front matter block has no fields rather than a bad structure
    let metadata = match metadata {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        metadata => metadata,
    };
    let frontmatter: Frontmatter =
        serde_yaml::from_value(metadata).map_err(|err| Error::Malformed {
            path: path.to_owned(),
            err,
        })?;

    let missing = |field| Error::MissingField {
        path: path.to_owned(),
        field,
    };
    let title = frontmatter
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| missing("title"))?;
    let date = frontmatter.date.ok_or_else(|| missing("date"))?;
    if !record::is_valid_date(&date) {
        return Err(Error::InvalidDate {
            path: path.to_owned(),
            date,
        });
    }

    let raw_tags = frontmatter.tags.unwrap_or_default();
    Ok(Record {
        output_path: record::output_path(&date, category, basename),
        title,
        date,
        tags: raw_tags
            .iter()
            .map(|t| slug::slugify(t))
            .filter(|t| !t.is_empty())
            .collect(),
        raw_tags,
        category: category.to_owned(),
        source_path: path.to_owned(),
    })
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a source document whose metadata can't be turned into a
/// [`Record`].
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the renderer fails to produce metadata.
    #[error("extracting metadata from `{}`: {err}", path.display())]
    Render { path: PathBuf, err: render::Error },

    /// Returned when the metadata doesn't have the expected structure.
    #[error("`{}`: malformed metadata: {err}", path.display())]
    Malformed {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when a required field is absent or empty.
    #[error("`{}`: missing required field `{field}`", path.display())]
    MissingField { path: PathBuf, field: &'static str },

    /// Returned when the date isn't a valid `YYYY/MM/DD` date.
    #[error("`{}`: date `{date}` is not of the form YYYY/MM/DD", path.display())]
    InvalidDate { path: PathBuf, date: String },

    /// Returned when the path has no usable file or directory name.
    #[error("invalid source path `{}`", .0.display())]
    InvalidPath(PathBuf),
}
