//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: extracting records from the
//! posts ([`crate::extract`]), rendering article pages ([`crate::write`]),
//! indexing the records ([`crate::index`]), rendering index pages
//! ([`crate::listing`]) and the RSS feed ([`crate::feed`]), and copying the
//! static assets ([`crate::assets`]).
//!
//! Everything is written to a staging directory next to the output directory.
//! Only once every step has succeeded does the staging directory replace the
//! output directory, so a failed build never leaves a half-written site
//! behind.

use crate::assets;
use crate::config::Config;
use crate::extract;
use crate::feed;
use crate::index;
use crate::listing;
use crate::pool;
use crate::record::{Catalog, DuplicateOutput, Record};
use crate::render::{RenderContext, Renderer, Template};
use crate::write::{self, Writer};
use std::path::{Component, Path, PathBuf};
use std::thread;
use tempfile::TempDir;
use thiserror::Error;
use walkdir::WalkDir;

/// What a successful build produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub articles: usize,
    pub index_pages: usize,
    pub feed_items: usize,
    pub assets: usize,
}

/// Builds the site described by `config`, rendering with `renderer`.
///
/// Categories are the subdirectories of the posts directory, sorted by name.
/// Those holding at least one post make up the navigation menu, and each of
/// them gets an index page. Records are extracted on a worker pool while the
/// static assets are copied, then every article is rendered. Index pages and
/// the feed only start once all articles are written.
///
/// The output directory is replaced wholesale, so it may not be, or contain,
/// the project or any of its source directories.
pub fn build_site(config: &Config, renderer: &dyn Renderer) -> Result<Summary> {
    check_output(config)?;
    let categories = categories(&config.posts_source_directory)?;
    let sources = sources(&config.posts_source_directory, &categories)?;

    let staging = stage(&config.output_directory)?;
    let root = staging.path();

    // Assets have no dependency on any record, and extraction doesn't write
    // anything, so the assets land in the tree before any generated page.
    let (extracted, copied) = thread::scope(|s| {
        let copy = s.spawn(|| assets::publish(&config.static_source_directory, root));
        let extracted = pool::map(config.threads, sources, |path: PathBuf| {
            extract::extract(renderer, &path)
        });
        (extracted, copy.join())
    });
    let records = extracted?;
    let copied = copied.map_err(|_| Error::WorkerPanicked("asset publisher"))??;

    let mut catalog = Catalog::new();
    for record in records {
        catalog.insert(record)?;
    }

    let index = index::index(catalog.records());
    let menu: Vec<String> = index.by_category.keys().cloned().collect();
    for category in categories.iter().filter(|c| !index.by_category.contains_key(*c)) {
        log::warn!("Category `{}` has no posts; leaving it out of the menu", category);
    }

    let post_processor = config.post_processor();
    let writer = Writer::new(root, renderer, post_processor.as_ref());
    let articles = catalog.records().iter().collect::<Vec<&Record>>();
    pool::map(config.threads, articles, |record: &Record| {
        let context = RenderContext::new(
            Template::Article,
            &record.title,
            &menu,
            &config.build_msg,
            &record.category,
        );
        writer.write_article(record, &context)
    })?;

    let targets = listing::targets(&index);
    let feed_config = config.feed_config();
    let (pages, feed_items) = thread::scope(|s| {
        let feed = s.spawn(|| -> feed::Result<usize> {
            let channel =
                feed::build_feed(&feed_config, &index.all.members, renderer, chrono::Utc::now())?;
            feed::write_feed(&channel, &writer)?;
            Ok(channel.items.len())
        });
        let pages = pool::map(config.threads, targets, |target| {
            listing::build_index(&writer, &target, &menu, &config.build_msg)
        });
        (pages, feed.join())
    });
    let pages = pages?;
    let feed_items = feed_items.map_err(|_| Error::WorkerPanicked("feed builder"))??;

    let claimed = writer.claimed();
    for asset in copied.iter().filter(|asset| claimed.contains(asset.as_str())) {
        log::warn!("Generated page {} replaces the static asset of the same path", asset);
    }

    publish(&staging, &config.output_directory)?;

    Ok(Summary {
        articles: catalog.len(),
        index_pages: pages.len(),
        feed_items,
        assets: copied.len(),
    })
}

/// Lists the category subdirectories of `posts`, sorted by name. Hidden
/// directories are ignored.
fn categories(posts: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(posts).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            log::debug!("Skip {}: not a category directory", entry.path().display());
            continue;
        }
        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| extract::Error::InvalidPath(entry.path().to_owned()))?;
        if name.starts_with('.') {
            log::debug!("Skip hidden directory {}", entry.path().display());
            continue;
        }
        names.push(name.to_owned());
    }
    names.sort();
    Ok(names)
}

/// Lists the buildable documents of every category, category by category and
/// in file name order within a category. This is the encounter order that
/// breaks ties between records sharing a date.
fn sources(posts: &Path, categories: &[String]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for category in categories {
        let walk = WalkDir::new(posts.join(category))
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for entry in walk {
            let entry = entry?;
            if entry.file_type().is_file() && extract::is_source(entry.path()) {
                sources.push(entry.into_path());
            } else {
                log::debug!("Skip {}", entry.path().display());
            }
        }
    }
    Ok(sources)
}

/// Refuses an output directory that is, or contains, the project or one of
/// its source directories: publishing removes the old output directory.
fn check_output(config: &Config) -> Result<()> {
    let output = normalize(&config.output_directory);
    let project = normalize(&config.project_directory);
    let inputs = [
        &config.posts_source_directory,
        &config.templates_directory,
        &config.static_source_directory,
    ];
    let inputs = inputs.iter().map(|dir| normalize(dir));
    for source in std::iter::once(project.clone()).chain(inputs) {
        // the output may live inside the project, but not inside its inputs
        let inside_input = source != project && output.starts_with(&source);
        if source.starts_with(&output) || inside_input {
            return Err(Error::UnsafeOutput {
                output: config.output_directory.clone(),
                source_directory: source,
            });
        }
    }
    Ok(())
}

/// Resolves `path` as far as it exists on disk, and lexically beyond that.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(path) = std::fs::canonicalize(path) {
        return path;
    }
    let mut out = match path.parent() {
        Some(parent) => normalize(parent),
        None => PathBuf::new(),
    };
    match path.components().next_back() {
        Some(Component::ParentDir) => {
            out.pop();
        }
        Some(Component::CurDir) | None => {}
        Some(component) => out.push(component),
    }
    out
}

/// Creates the staging directory beside `output`, so the final rename never
/// crosses file systems.
fn stage(output: &Path) -> Result<TempDir> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|err| Error::Io {
        path: parent.to_owned(),
        err,
    })?;
    tempfile::Builder::new()
        .prefix(".gazette-staging-")
        .tempdir_in(parent)
        .map_err(|err| Error::Io {
            path: parent.to_owned(),
            err,
        })
}

/// Replaces `output` with the staged tree. Dropping `staging` afterwards is
/// harmless: its path no longer exists.
fn publish(staging: &TempDir, output: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        // temporary directories are created private to the user
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755))
            .map_err(|err| Error::Io {
                path: staging.path().to_owned(),
                err,
            })?;
    }

    rmdir(output)?;
    std::fs::rename(staging.path(), output).map_err(|err| Error::Io {
        path: output.to_owned(),
        err,
    })?;
    log::info!("Publish site -> {}", output.display());
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every variant aborts the build before
/// anything is published.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the posts directory can't be listed.
    #[error("listing source documents: {0}")]
    Walk(#[from] walkdir::Error),

    /// Returned when a source document's metadata is unusable.
    #[error(transparent)]
    Extraction(#[from] extract::Error),

    /// Returned when two records resolve to the same output path.
    #[error(transparent)]
    DuplicateOutput(#[from] DuplicateOutput),

    /// Returned for errors rendering or writing pages.
    #[error(transparent)]
    Write(#[from] write::Error),

    /// Returned for errors building index pages.
    #[error(transparent)]
    Listing(#[from] listing::Error),

    /// Returned for errors building the feed.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    /// Returned for errors copying the static assets.
    #[error(transparent)]
    Assets(#[from] assets::Error),

    /// Returned when publishing would remove the project or its sources.
    #[error(
        "output directory `{}` overlaps the source directory `{}`",
        output.display(),
        source_directory.display()
    )]
    UnsafeOutput {
        output: PathBuf,
        source_directory: PathBuf,
    },

    /// Returned for I/O problems while removing the old output directory.
    #[error("cleaning directory `{}`: {err}", path.display())]
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems staging or publishing the output.
    #[error("`{}`: {err}", path.display())]
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when a background step panicked.
    #[error("the {0} panicked")]
    WorkerPanicked(&'static str),
}
