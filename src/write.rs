//! Materializes rendered artifacts on disk. The [`Writer`] owns the set of
//! output paths produced so far, so no two artifacts of a build can target the
//! same file, and creates every intermediate directory before the renderer
//! runs.

use crate::record::{self, Record};
use crate::render::{self, process, Document, RenderContext, Renderer};
use std::collections::BTreeSet;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// A program run over every article page after rendering, invoked as
/// `program args... <input> <output>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostProcessor {
    pub program: PathBuf,
    pub args: Vec<String>,

    /// The directory the program runs in; relative arguments resolve
    /// against it.
    pub current_dir: Option<PathBuf>,

    pub timeout: Duration,
}

impl PostProcessor {
    /// Builds a post processor from a command line such as
    /// `["node", "tools/tex2chtml.js"]`. Returns `None` for an empty command.
    pub fn from_command(
        command: &[String],
        current_dir: Option<&Path>,
        timeout: Duration,
    ) -> Option<PostProcessor> {
        let (program, args) = command.split_first()?;
        Some(PostProcessor {
            program: PathBuf::from(program),
            args: args.to_vec(),
            current_dir: current_dir.map(Path::to_path_buf),
            timeout,
        })
    }

    pub fn run(&self, input: &Path, output: &Path) -> render::Result<()> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(input).arg(output);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        process::run(command, None, self.timeout)?;
        Ok(())
    }
}

/// Renders documents and writes the results under a root directory.
pub struct Writer<'a> {
    /// The directory output paths are resolved against.
    root: &'a Path,

    renderer: &'a dyn Renderer,

    /// Applied to article pages only.
    post_processor: Option<&'a PostProcessor>,

    claimed: Mutex<BTreeSet<String>>,
}

impl<'a> Writer<'a> {
    pub fn new(
        root: &'a Path,
        renderer: &'a dyn Renderer,
        post_processor: Option<&'a PostProcessor>,
    ) -> Writer<'a> {
        Writer {
            root,
            renderer,
            post_processor,
            claimed: Mutex::new(BTreeSet::new()),
        }
    }

    /// Renders the source document of `record` to its output path.
    pub fn write_article(&self, record: &Record, context: &RenderContext) -> Result<PathBuf> {
        let path = self.claim(&record.output_path)?;
        log::info!("Build page -> {}", path.display());
        let html = self
            .renderer
            .page(&Document::File(&record.source_path), context)
            .map_err(|err| Error::Render {
                output_path: record.output_path.clone(),
                document: record.source_path.display().to_string(),
                err,
            })?;

        match self.post_processor {
            None => write_file(&path, html.as_bytes())?,
            Some(post_processor) => {
                let dir = path.parent().unwrap_or(self.root);
                let mut raw = tempfile::NamedTempFile::new_in(dir).map_err(|err| Error::Io {
                    path: dir.to_owned(),
                    err,
                })?;
                raw.write_all(html.as_bytes()).map_err(|err| Error::Io {
                    path: raw.path().to_owned(),
                    err,
                })?;
                log::info!("Post process page {} -> {}", raw.path().display(), path.display());
                post_processor
                    .run(raw.path(), &path)
                    .map_err(|err| Error::PostProcess {
                        output_path: record.output_path.clone(),
                        err,
                    })?;
            }
        }
        Ok(path)
    }

    /// Renders an in-memory document to `output_path`.
    pub fn write_synthetic(
        &self,
        output_path: &str,
        document: &str,
        context: &RenderContext,
    ) -> Result<PathBuf> {
        let path = self.claim(output_path)?;
        let html = self
            .renderer
            .page(&Document::Synthetic(document), context)
            .map_err(|err| Error::Render {
                output_path: output_path.to_owned(),
                document: String::from("synthetic document"),
                err,
            })?;
        write_file(&path, html.as_bytes())?;
        Ok(path)
    }

    /// Writes already-rendered bytes to `output_path`.
    pub fn write_bytes(&self, output_path: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.claim(output_path)?;
        write_file(&path, bytes)?;
        Ok(path)
    }

    /// The output paths written (or being written) so far.
    pub fn claimed(&self) -> BTreeSet<String> {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reserves `output_path` and prepares its directory.
    fn claim(&self, output_path: &str) -> Result<PathBuf> {
        let newly_claimed = self
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(output_path.to_owned());
        if !newly_claimed {
            return Err(Error::DuplicateOutput(output_path.to_owned()));
        }

        let path = record::resolve(self.root, output_path);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                path: dir.to_owned(),
                err,
            })?;
        }
        Ok(path)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a second artifact targets an output path already taken.
    #[error("output path `{0}` is produced more than once")]
    DuplicateOutput(String),

    /// Returned when the renderer fails.
    #[error("rendering `{output_path}` from {document}: {err}")]
    Render {
        output_path: String,
        document: String,
        err: render::Error,
    },

    /// Returned when the post processor fails.
    #[error("post-processing `{output_path}`: {err}")]
    PostProcess {
        output_path: String,
        err: render::Error,
    },

    /// An error writing the output files.
    #[error("writing `{}`: {err}", path.display())]
    Io { path: PathBuf, err: io::Error },
}
