//! Renders documents by invoking `pandoc`. Every argument is passed as its
//! own element of the argument vector; nothing goes through a shell, so titles
//! and variables never need quoting.

use super::process;
use super::{Document, RenderContext, Renderer, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Renders with the `pandoc` program.
#[derive(Clone, Debug)]
pub struct PandocRenderer {
    /// The pandoc executable.
    pub program: PathBuf,

    /// The directory holding `article.html` and `index.html`.
    pub templates_directory: PathBuf,

    /// An optional pandoc defaults file, passed as `--defaults`.
    pub defaults: Option<PathBuf>,

    /// How long a single invocation may run.
    pub timeout: Duration,
}

impl PandocRenderer {
    /// The arguments for rendering `document` through a template.
    pub fn page_args(&self, document: &Document, context: &RenderContext) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Document::File(path) = document {
            args.push(path.as_os_str().to_owned());
        }
        args.extend(
            ["-f", "markdown", "-t", "html", "--standalone"]
                .iter()
                .map(OsString::from),
        );

        let mut template = OsString::from("--template=");
        template.push(
            self.templates_directory
                .join(format!("{}.html", context.template.name())),
        );
        args.push(template);

        if let Some(defaults) = &self.defaults {
            let mut arg = OsString::from("--defaults=");
            arg.push(defaults);
            args.push(arg);
        }

        args.push(format!("--metadata=pagetitle:{}", context.title).into());
        for category in &context.menu {
            args.push(format!("--metadata=categories:{}", category).into());
        }
        for (key, value) in &context.variables {
            args.push(format!("--variable={}:{}", key, value).into());
        }
        args
    }

    /// The arguments for rendering the bare HTML body of `source`.
    pub fn fragment_args(&self, source: &Path) -> Vec<OsString> {
        let mut args = vec![source.as_os_str().to_owned()];
        args.extend(["-f", "markdown", "-t", "html"].iter().map(OsString::from));
        args
    }

    fn command(&self, args: Vec<OsString>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(args);
        command
    }
}

impl Renderer for PandocRenderer {
    fn fragment(&self, source: &Path) -> Result<String> {
        log::debug!("pandoc fragment {}", source.display());
        process::run_to_string(self.command(self.fragment_args(source)), None, self.timeout)
    }

    fn page(&self, document: &Document, context: &RenderContext) -> Result<String> {
        log::debug!("pandoc {} {}", context.template, document.describe());
        let stdin = match document {
            Document::File(_) => None,
            Document::Synthetic(body) => Some(body.as_bytes()),
        };
        process::run_to_string(
            self.command(self.page_args(document, context)),
            stdin,
            self.timeout,
        )
    }
}
