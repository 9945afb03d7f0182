//! Defines the [`Record`] type, the immutable metadata extracted from one
//! source document, and the [`Catalog`] accumulator which owns every record
//! of a build and guarantees that no two records share an output path.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The format of a record date: fixed-width `YYYY/MM/DD`, which sorts
/// lexically in chronological order.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// The extracted state of one source document. Records are created once
/// during extraction and only ever referenced afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Record {
    /// The title from the document's front matter. Never empty.
    pub title: String,

    /// The publication date, `YYYY/MM/DD`.
    pub date: String,

    /// The slugified tags. A [`BTreeSet`] so iteration (and thus the order
    /// tag pages are built in) is deterministic.
    pub tags: BTreeSet<String>,

    /// The tags as written in the front matter, before slugifying.
    pub raw_tags: Vec<String>,

    /// The name of the source subdirectory containing the document.
    pub category: String,

    /// The path of the source document.
    pub source_path: PathBuf,

    /// The root-relative URL path of the rendered page, e.g.
    /// `/2024/01/10/blog/hello.html`.
    pub output_path: String,
}

impl Record {
    /// The year component of [`Record::date`].
    pub fn year(&self) -> &str {
        year_of(&self.date)
    }
}

/// Returns the `YYYY` prefix of a `YYYY/MM/DD` date.
pub fn year_of(date: &str) -> &str {
    date.split('/').next().unwrap_or(date)
}

/// Returns whether `date` is a valid, fixed-width `YYYY/MM/DD` date.
pub fn is_valid_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'/'
        && bytes[7] == b'/'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
        && chrono::NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok()
}

/// Derives the output path of a page: `/{date}/{category}/{basename}.html`.
pub fn output_path(date: &str, category: &str, basename: &str) -> String {
    format!("/{}/{}/{}.html", date, category, basename)
}

/// Resolves a root-relative output path against a directory on disk.
pub fn resolve(root: &Path, output_path: &str) -> PathBuf {
    root.join(output_path.trim_start_matches('/'))
}

/// Returned when two records resolve to the same output path.
#[derive(Debug, Error)]
#[error(
    "`{}` and `{}` both resolve to output path `{output_path}`",
    first.display(),
    second.display()
)]
pub struct DuplicateOutput {
    pub output_path: String,
    pub first: PathBuf,
    pub second: PathBuf,
}

/// Accumulates the records of a build in encounter order. Inserting a record
/// whose output path is already taken fails with [`DuplicateOutput`].
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<Record>,
    by_output_path: HashMap<String, usize>,

    /// Every (lowercased) spelling seen for each tag slug.
    spellings: BTreeMap<String, BTreeSet<String>>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    /// Appends `record`, rejecting it if another record already claimed its
    /// output path.
    pub fn insert(&mut self, record: Record) -> Result<(), DuplicateOutput> {
        if let Some(&i) = self.by_output_path.get(&record.output_path) {
            return Err(DuplicateOutput {
                output_path: record.output_path,
                first: self.records[i].source_path.clone(),
                second: record.source_path,
            });
        }
        self.by_output_path
            .insert(record.output_path.clone(), self.records.len());
        for raw in &record.raw_tags {
            let slug = slug::slugify(raw);
            if slug.is_empty() {
                continue;
            }
            let spellings = self.spellings.entry(slug.clone()).or_default();
            if spellings.insert(raw.to_lowercase()) && spellings.len() > 1 {
                log::warn!(
                    "Tag `{}` in {} shares the tag page `{}` with {:?}",
                    raw,
                    record.source_path.display(),
                    slug,
                    spellings
                );
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// The tag slugs that more than one distinct spelling collapsed into,
    /// with those spellings.
    pub fn merged_tags(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.spellings
            .iter()
            .filter(|(_, spellings)| spellings.len() > 1)
            .map(|(slug, spellings)| (slug.as_str(), spellings))
    }

    /// The records in encounter order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn record(title: &str, date: &str, category: &str, tags: &[&str]) -> Record {
    let basename = slug::slugify(title);
    Record {
        title: title.to_owned(),
        date: date.to_owned(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        raw_tags: tags.iter().map(|t| t.to_string()).collect(),
        category: category.to_owned(),
        source_path: PathBuf::from(format!("/src/posts/{}/{}.md", category, basename)),
        output_path: output_path(date, category, &basename),
    }
}
