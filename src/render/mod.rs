//! The seam between the pipeline and the document renderer. The pipeline only
//! ever talks to a [`Renderer`]; the renderer turns a document plus a
//! [`RenderContext`] into HTML. Two backends are provided:
//! [`pandoc::PandocRenderer`] shells out to `pandoc` with an explicit argument
//! list, and [`native::NativeRenderer`] renders in-process.

use crate::frontmatter;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub mod native;
pub mod pandoc;
pub mod process;

/// The variable holding the free-text build message.
pub const BUILD_MSG: &str = "build_msg";

/// The variable naming the category (or group) a page belongs to.
pub const CATEGORY: &str = "category";

/// The fixed set of page templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Template {
    Article,
    Index,
}

impl Template {
    /// The template's name, which is also the stem of its file in the
    /// templates directory.
    pub fn name(self) -> &'static str {
        match self {
            Template::Article => "article",
            Template::Index => "index",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The parameters for rendering one output. Built fresh for every call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderContext {
    pub template: Template,
    pub title: String,

    /// The category names, sorted, for site navigation.
    pub menu: Vec<String>,

    /// Free-form variables. Always contains [`BUILD_MSG`] and [`CATEGORY`].
    pub variables: BTreeMap<String, String>,
}

impl RenderContext {
    pub fn new(
        template: Template,
        title: &str,
        menu: &[String],
        build_msg: &str,
        category: &str,
    ) -> RenderContext {
        let mut variables = BTreeMap::new();
        variables.insert(BUILD_MSG.to_owned(), build_msg.to_owned());
        variables.insert(CATEGORY.to_owned(), category.to_owned());
        RenderContext {
            template,
            title: title.to_owned(),
            menu: menu.to_vec(),
            variables,
        }
    }
}

/// The input to a templated render: either a source file on disk or a
/// synthetic document held in memory.
#[derive(Clone, Copy, Debug)]
pub enum Document<'a> {
    File(&'a Path),
    Synthetic(&'a str),
}

impl Document<'_> {
    /// Describes the document for error messages.
    pub fn describe(&self) -> String {
        match self {
            Document::File(path) => path.display().to_string(),
            Document::Synthetic(_) => String::from("<synthetic document>"),
        }
    }
}

/// An external document renderer. Implementations must be pure: the same
/// document and context always yield the same output.
pub trait Renderer: Send + Sync {
    /// Metadata mode: returns the structured front matter of `source`.
    fn metadata(&self, source: &Path) -> Result<serde_yaml::Value> {
        let contents = read(source)?;
        let (value, _) = frontmatter::parse(&contents).map_err(|err| Error::Frontmatter {
            path: source.to_owned(),
            err,
        })?;
        Ok(value)
    }

    /// HTML mode: returns the rendered body of `source` without a template.
    fn fragment(&self, source: &Path) -> Result<String>;

    /// Renders `document` through the template named by `context`.
    fn page(&self, document: &Document, context: &RenderContext) -> Result<String>;
}

/// Reads a source document to a string.
pub(crate) fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| Error::Read {
        path: path.to_owned(),
        err,
    })
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed render. Any of these aborts the build.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a source document or template can't be read.
    #[error("reading `{}`: {err}", path.display())]
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when a document's front matter is malformed.
    #[error("`{}`: {err}", path.display())]
    Frontmatter {
        path: PathBuf,
        err: frontmatter::Error,
    },

    /// Returned when the renderer process can't be started.
    #[error("starting `{program}`: {err}")]
    Spawn { program: String, err: std::io::Error },

    /// Returned for I/O problems talking to the renderer process.
    #[error("communicating with `{program}`: {err}")]
    Io { program: String, err: std::io::Error },

    /// Returned when the renderer process exits unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// Returned when the renderer process doesn't finish in time.
    #[error("`{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// Returned when the renderer's output isn't valid UTF-8.
    #[error("`{program}` produced invalid UTF-8 output")]
    Utf8 { program: String },

    /// Returned for errors parsing or executing a template.
    #[error("template `{template}`: {message}")]
    Template { template: String, message: String },
}
