//! The library code for the `gazette` static site generator. Posts are
//! Markdown documents grouped into categories (`posts/<category>/*.md`), and
//! every page is produced by a document [`render::Renderer`], either `pandoc`
//! or the in-process backend. A build happens in two distinct steps:
//!
//! 1. Extracting a [`record::Record`] from every source document
//!    ([`crate::extract`])
//! 2. Converting the records into output files on disk
//!
//! The second step is itself composed of several sub-steps:
//!
//! 1. Rendering article pages ([`crate::write`])
//! 2. Grouping the records by category, by tag, and into the group of all
//!    records ([`crate::index`])
//! 3. Rendering one index page per group ([`crate::listing`])
//! 4. Rendering the RSS feed ([`crate::feed`])
//!
//! Copying the static assets ([`crate::assets`]) is independent of all of the
//! above. [`build::build_site`] drives the whole thing.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod assets;
pub mod build;
pub mod config;
pub mod extract;
pub mod feed;
pub mod frontmatter;
pub mod index;
pub mod listing;
pub mod markdown;
pub mod pool;
pub mod record;
pub mod render;
pub mod write;
