//! Loads the project configuration. A project is a directory containing a
//! `metadata.yaml` file next to the `posts/`, `templates/` and `public/`
//! directories:
//!
//! ```yaml
//! site_name: My site
//! site_url: https://example.org
//! site_description: Notes and essays
//! site_logo: img/logo.png
//! build:
//!   renderer: pandoc
//!   timeout_secs: 60
//!   postprocess: [node, tools/tex2chtml.js]
//! ```

use crate::feed::FeedConfig;
use crate::render::native::NativeRenderer;
use crate::render::pandoc::PandocRenderer;
use crate::render::{self, Renderer};
use crate::write::PostProcessor;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// The name of the project file.
pub const METADATA_FILE: &str = "metadata.yaml";

/// Which [`Renderer`] backend to build with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Pandoc,
    Native,
}

impl FromStr for RendererKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<RendererKind> {
        match s {
            "pandoc" => Ok(RendererKind::Pandoc),
            "native" => Ok(RendererKind::Native),
            _ => Err(anyhow!("Unknown renderer `{}`; expected `pandoc` or `native`", s)),
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            RendererKind::Pandoc => "pandoc",
            RendererKind::Native => "native",
        })
    }
}

fn default_site_logo() -> String {
    String::from("img/logo.png")
}

fn default_pandoc() -> PathBuf {
    PathBuf::from("pandoc")
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Deserialize)]
struct Metadata {
    site_name: String,
    site_url: Url,
    site_description: String,

    #[serde(default = "default_site_logo")]
    site_logo: String,

    #[serde(default)]
    build: Build,
}

#[derive(Deserialize)]
#[serde(default)]
struct Build {
    renderer: RendererKind,
    pandoc: PathBuf,
    pandoc_defaults: Option<PathBuf>,
    timeout_secs: u64,
    threads: Option<usize>,
    postprocess: Vec<String>,
}

impl Default for Build {
    fn default() -> Build {
        Build {
            renderer: RendererKind::default(),
            pandoc: default_pandoc(),
            pandoc_defaults: None,
            timeout_secs: default_timeout_secs(),
            threads: None,
            postprocess: Vec::new(),
        }
    }
}

/// Settings given on the command line, which win over the project file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub build_msg: Option<String>,
    pub output_directory: Option<PathBuf>,
    pub threads: Option<usize>,
    pub renderer: Option<RendererKind>,
}

/// The resolved configuration of one build. All paths are absolute.
#[derive(Clone, Debug)]
pub struct Config {
    pub site_name: String,
    pub site_url: Url,
    pub site_description: String,

    /// The logo's path relative to the site root.
    pub site_logo: String,

    pub project_directory: PathBuf,
    pub posts_source_directory: PathBuf,
    pub templates_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub output_directory: PathBuf,

    /// Free text handed to every template, e.g. a footer notice.
    pub build_msg: String,

    pub renderer: RendererKind,
    pub pandoc: PathBuf,
    pub pandoc_defaults: Option<PathBuf>,

    /// The limit on a single renderer or post-processor invocation.
    pub timeout: Duration,

    pub threads: usize,

    /// The post-processing command line; empty when disabled.
    pub postprocess: Vec<String>,
}

impl Config {
    /// Finds the project containing `dir` by searching `dir` and its parents
    /// for [`METADATA_FILE`], and loads its configuration.
    pub fn from_directory(dir: &Path, overrides: Overrides) -> Result<Config> {
        let dir = std::fs::canonicalize(dir)
            .with_context(|| format!("Resolving project directory `{}`", dir.display()))?;
        let mut candidate: Option<&Path> = Some(&dir);
        while let Some(dir) = candidate {
            let path = dir.join(METADATA_FILE);
            if path.exists() {
                return Config::from_metadata_file(&path, overrides)
                    .with_context(|| format!("Loading configuration from `{}`", path.display()));
            }
            candidate = dir.parent();
        }
        Err(anyhow!(
            "Could not find `{}` in `{}` or any parent directory",
            METADATA_FILE,
            dir.display()
        ))
    }

    /// Loads the configuration from a project file. The directory containing
    /// it is the project root.
    pub fn from_metadata_file(path: &Path, overrides: Overrides) -> Result<Config> {
        let metadata: Metadata = serde_yaml::from_reader(open(path, "project")?)?;
        let root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path `{}`",
                path.display()
            )
        })?;

        let output_directory = match overrides.output_directory {
            Some(output) => std::env::current_dir()?.join(output),
            None => root.join(".build"),
        };
        let build = metadata.build;
        let threads = overrides.threads.or(build.threads).unwrap_or_else(num_cpus::get);
        if threads == 0 {
            return Err(anyhow!("`threads` must be at least 1"));
        }

        Ok(Config {
            site_name: metadata.site_name,
            site_url: metadata.site_url,
            site_description: metadata.site_description,
            site_logo: metadata.site_logo,
            posts_source_directory: root.join("posts"),
            templates_directory: root.join("templates"),
            static_source_directory: root.join("public"),
            output_directory,
            build_msg: overrides.build_msg.unwrap_or_default(),
            renderer: overrides.renderer.unwrap_or(build.renderer),
            pandoc: build.pandoc,
            pandoc_defaults: build.pandoc_defaults.map(|defaults| root.join(defaults)),
            timeout: Duration::from_secs(build.timeout_secs),
            threads,
            postprocess: build.postprocess,
            project_directory: root.to_owned(),
        })
    }

    pub fn feed_config(&self) -> FeedConfig<'_> {
        FeedConfig {
            site_name: &self.site_name,
            site_url: &self.site_url,
            site_description: &self.site_description,
            site_logo: &self.site_logo,
        }
    }

    /// Builds the configured renderer backend.
    pub fn renderer(&self) -> render::Result<Box<dyn Renderer>> {
        Ok(match self.renderer {
            RendererKind::Pandoc => Box::new(PandocRenderer {
                program: self.pandoc.clone(),
                templates_directory: self.templates_directory.clone(),
                defaults: self.pandoc_defaults.clone(),
                timeout: self.timeout,
            }),
            RendererKind::Native => {
                Box::new(NativeRenderer::from_directory(&self.templates_directory)?)
            }
        })
    }

    /// The post processor, if one is configured. It runs in the project
    /// directory.
    pub fn post_processor(&self) -> Option<PostProcessor> {
        PostProcessor::from_command(
            &self.postprocess,
            Some(&self.project_directory),
            self.timeout,
        )
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    const MINIMAL: &str = indoc! {"
        site_name: Example
        site_url: https://example.org/blog
        site_description: An example site
    "};

    fn project(metadata: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), metadata).unwrap();
        dir
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let dir = project(MINIMAL);
        let config = Config::from_directory(dir.path(), Overrides::default())?;
        let root = std::fs::canonicalize(dir.path())?;

        assert_eq!("Example", config.site_name);
        assert_eq!("https://example.org/blog", config.site_url.as_str());
        assert_eq!("img/logo.png", config.site_logo);
        assert_eq!(root.join("posts"), config.posts_source_directory);
        assert_eq!(root.join("templates"), config.templates_directory);
        assert_eq!(root.join("public"), config.static_source_directory);
        assert_eq!(root.join(".build"), config.output_directory);
        assert_eq!("", config.build_msg);
        assert_eq!(RendererKind::Pandoc, config.renderer);
        assert_eq!(PathBuf::from("pandoc"), config.pandoc);
        assert_eq!(Duration::from_secs(60), config.timeout);
        assert!(config.threads >= 1);
        assert!(config.post_processor().is_none());
        Ok(())
    }

    #[test]
    fn test_found_from_nested_directory() -> Result<()> {
        let dir = project(MINIMAL);
        let nested = dir.path().join("posts/blog");
        std::fs::create_dir_all(&nested)?;
        let config = Config::from_directory(&nested, Overrides::default())?;
        assert_eq!(std::fs::canonicalize(dir.path())?, config.project_directory);
        Ok(())
    }

    #[test]
    fn test_build_section_and_overrides() -> Result<()> {
        let dir = project(indoc! {"
            site_name: Example
            site_url: https://example.org
            site_description: An example site
            site_logo: logo.svg
            build:
              renderer: native
              pandoc_defaults: pandoc.yaml
              timeout_secs: 5
              threads: 3
              postprocess: [node, tools/tex2chtml.js]
        "});
        let root = std::fs::canonicalize(dir.path())?;

        let config = Config::from_directory(dir.path(), Overrides::default())?;
        assert_eq!("logo.svg", config.site_logo);
        assert_eq!(RendererKind::Native, config.renderer);
        assert_eq!(Some(root.join("pandoc.yaml")), config.pandoc_defaults);
        assert_eq!(Duration::from_secs(5), config.timeout);
        assert_eq!(3, config.threads);
        assert_eq!(
            Some(PostProcessor {
                program: PathBuf::from("node"),
                args: vec![String::from("tools/tex2chtml.js")],
                current_dir: Some(root.clone()),
                timeout: Duration::from_secs(5),
            }),
            config.post_processor()
        );

        let config = Config::from_directory(
            dir.path(),
            Overrides {
                build_msg: Some(String::from("built by CI")),
                output_directory: Some(root.join("out")),
                threads: Some(1),
                renderer: Some(RendererKind::Pandoc),
            },
        )?;
        assert_eq!("built by CI", config.build_msg);
        assert_eq!(root.join("out"), config.output_directory);
        assert_eq!(1, config.threads);
        assert_eq!(RendererKind::Pandoc, config.renderer);
        Ok(())
    }

    #[test]
    fn test_missing_required_field() {
        let dir = project("site_name: Example\nsite_url: https://example.org\n");
        assert!(Config::from_directory(dir.path(), Overrides::default()).is_err());
    }

    #[test]
    fn test_zero_threads() {
        let dir = project(MINIMAL);
        let overrides = Overrides {
            threads: Some(0),
            ..Overrides::default()
        };
        assert!(Config::from_directory(dir.path(), overrides).is_err());
    }

    #[test]
    fn test_renderer_kind_from_str() -> Result<()> {
        assert_eq!(RendererKind::Native, "native".parse()?);
        assert_eq!(RendererKind::Pandoc, "pandoc".parse()?);
        assert!("latex".parse::<RendererKind>().is_err());
        Ok(())
    }
}
