//! Builds index pages. An index page is rendered from a synthetic document
//! whose body is empty and whose front matter holds a single `list` field:
//! the group's year buckets.
//!
//! ```md
//! ---
//! list:
//!   - year: "2024"
//!     posts:
//!       - title: Hello
//!         date: 2024/01/10
//!         url: /2024/01/10/blog/hello.html
//!         category: blog
//!         tags:
//!           - a
//! ---
//! ```
//!
//! Index pages live at:
//!
//! * `/category/{name}/index.html` for each category
//! * `/tag/{name}.html` for each tag
//! * `/index.html` for the group of all records

use crate::frontmatter;
use crate::index::{Group, Index};
use crate::record::Record;
use crate::render::{RenderContext, Template};
use crate::write::{self, Writer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The title (and display name) of the home index.
pub const HOME: &str = "index";

/// One record as it appears in a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub date: String,
    pub url: String,
    pub category: String,
    pub tags: Vec<String>,
}

impl From<&Record> for Entry {
    fn from(record: &Record) -> Entry {
        Entry {
            title: record.title.clone(),
            date: record.date.clone(),
            url: record.output_path.clone(),
            category: record.category.clone(),
            tags: record.tags.iter().cloned().collect(),
        }
    }
}

/// The records of one year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Year {
    pub year: String,
    pub posts: Vec<Entry>,
}

/// The structured block of a listing document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub list: Vec<Year>,
}

impl Listing {
    pub fn from_group(group: &Group) -> Listing {
        Listing {
            list: group
                .year_buckets()
                .into_iter()
                .map(|bucket| Year {
                    year: bucket.year.to_owned(),
                    posts: bucket.members.into_iter().map(Entry::from).collect(),
                })
                .collect(),
        }
    }

    /// The URLs of every entry, in listing order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.list
            .iter()
            .flat_map(|year| year.posts.iter().map(|entry| entry.url.as_str()))
    }
}

/// Serializes `group` into a synthetic listing document.
pub fn document(group: &Group) -> Result<String> {
    let yaml = serde_yaml::to_string(&Listing::from_group(group))?;
    // serde_yaml opens the document with its own `---`
    let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
    Ok(format!("---\n{}\n---\n", yaml.trim_end()))
}

/// Parses a synthetic listing document back into a [`Listing`].
pub fn parse(document: &str) -> Result<Listing> {
    let (value, _) = frontmatter::parse(document)?;
    Ok(serde_yaml::from_value(value)?)
}

/// One index page to build.
#[derive(Clone, Debug)]
pub struct Target<'i, 'a> {
    pub group: &'i Group<'a>,
    pub display_name: String,
    pub output_path: String,
}

/// Returns one [`Target`] per category, per tag, and one for the home index,
/// in that order. Keys are unique within each dimension, so no page is built
/// twice.
pub fn targets<'i, 'a>(index: &'i Index<'a>) -> Vec<Target<'i, 'a>> {
    let categories = index.by_category.iter().map(|(name, group)| Target {
        group,
        display_name: name.clone(),
        output_path: category_path(name),
    });
    let tags = index.by_tag.iter().map(|(name, group)| Target {
        group,
        display_name: name.clone(),
        output_path: tag_path(name),
    });
    let home = std::iter::once(Target {
        group: &index.all,
        display_name: HOME.to_owned(),
        output_path: String::from("/index.html"),
    });
    categories.chain(tags).chain(home).collect()
}

pub fn category_path(name: &str) -> String {
    format!("/category/{}/index.html", name)
}

pub fn tag_path(name: &str) -> String {
    format!("/tag/{}.html", name)
}

/// Renders one index page through the writer.
pub fn build_index(
    writer: &Writer,
    target: &Target,
    menu: &[String],
    build_msg: &str,
) -> Result<PathBuf> {
    let document = document(target.group)?;
    let context = RenderContext::new(
        Template::Index,
        &target.display_name,
        menu,
        build_msg,
        &target.display_name,
    );
    let path = writer.write_synthetic(&target.output_path, &document, &context)?;
    log::info!("Build {} index -> {}", target.display_name, path.display());
    Ok(path)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure building or reading a listing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("listing document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("reading listing: {0}")]
    Frontmatter(#[from] frontmatter::Error),

    #[error(transparent)]
    Write(#[from] write::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::{index, ALL};
    use crate::record::record;
    use crate::render::{Document, Renderer};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::path::Path;

    #[test]
    fn test_document_round_trip() -> Result<()> {
        let records = vec![
            record("Quote \"me\"", "2023/06/01", "notes", &["a"]),
            record("Hello: world", "2024/01/10", "blog", &["a", "b"]),
            record("Ünïcode", "2024/02/02", "blog", &[]),
        ];
        let group = Group::new(ALL, records.iter().collect());
        let listing = parse(&document(&group)?)?;

        assert_eq!(Listing::from_group(&group), listing);
        let urls: BTreeSet<&str> = listing.urls().collect();
        let members: BTreeSet<&str> = group.members.iter().map(|r| r.output_path.as_str()).collect();
        assert_eq!(members, urls);

        let years: Vec<&str> = listing.list.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(vec!["2024", "2023"], years);
        Ok(())
    }

    #[test]
    fn test_empty_group_document() -> Result<()> {
        let group = Group::new(ALL, Vec::new());
        let document = document(&group)?;
        assert!(document.starts_with("---\n"));
        assert!(document.ends_with("\n---\n"));
        assert!(parse(&document)?.list.is_empty());
        Ok(())
    }

    #[test]
    fn test_targets() {
        let records = vec![
            record("Blog", "2024/01/10", "blog", &["a", "b"]),
            record("Notes", "2023/06/01", "notes", &["a"]),
        ];
        let index = index(&records);
        let targets: Vec<(String, String, usize)> = targets(&index)
            .into_iter()
            .map(|t| (t.display_name, t.output_path, t.group.len()))
            .collect();
        assert_eq!(
            vec![
                ("blog".to_owned(), "/category/blog/index.html".to_owned(), 1),
                ("notes".to_owned(), "/category/notes/index.html".to_owned(), 1),
                ("a".to_owned(), "/tag/a.html".to_owned(), 2),
                ("b".to_owned(), "/tag/b.html".to_owned(), 1),
                ("index".to_owned(), "/index.html".to_owned(), 2),
            ],
            targets
        );
    }

    /// Renders the title, category variable and document verbatim.
    struct Verbatim;

    impl Renderer for Verbatim {
        fn fragment(&self, _: &Path) -> crate::render::Result<String> {
            Ok(String::new())
        }

        fn page(&self, document: &Document, context: &RenderContext) -> crate::render::Result<String> {
            let body = match document {
                Document::Synthetic(body) => body.to_string(),
                Document::File(path) => path.display().to_string(),
            };
            Ok(format!("{}|{}|{}", context.title, context.variables["category"], body))
        }
    }

    #[test]
    fn test_build_index() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let writer = Writer::new(dir.path(), &Verbatim, None);
        let records = vec![record("Blog", "2024/01/10", "blog", &["a"])];
        let index = index(&records);
        let targets = targets(&index);
        let path = build_index(&writer, &targets[1], &[String::from("blog")], "msg")?;

        assert_eq!(dir.path().join("tag/a.html"), path);
        let html = std::fs::read_to_string(&path).unwrap();
        let mut parts = html.splitn(3, '|');
        assert_eq!(Some("a"), parts.next());
        assert_eq!(Some("a"), parts.next());
        let listing = parse(parts.next().unwrap())?;
        assert_eq!(vec!["/2024/01/10/blog/blog.html"], listing.urls().collect::<Vec<_>>());
        Ok(())
    }
}
