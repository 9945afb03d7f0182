//! Support for creating RSS 2.0 feeds from a list of records.

use crate::record::{Record, DATE_FORMAT};
use crate::render::{self, Renderer};
use crate::write::{self, Writer};
use chrono::{DateTime, NaiveDate, Utc};
use rss::{Channel, Guid, Image, Item};
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Where the feed is written, relative to the output root.
pub const FEED_PATH: &str = "/feed.xml";

/// Bundled site metadata for creating a feed.
#[derive(Clone, Copy, Debug)]
pub struct FeedConfig<'a> {
    pub site_name: &'a str,
    pub site_url: &'a Url,
    pub site_description: &'a str,

    /// The logo's path relative to the site root.
    pub site_logo: &'a str,
}

/// Creates the feed channel from `records`, which must already be sorted
/// most-recent first; items keep that order. Each item's description is the
/// record's full HTML body, obtained from a separate render of its source.
/// `now` becomes the channel's `lastBuildDate`.
pub fn build_feed(
    config: &FeedConfig,
    records: &[&Record],
    renderer: &dyn Renderer,
    now: DateTime<Utc>,
) -> Result<Channel> {
    let latest = records.first().ok_or(Error::Empty)?;
    let items = records
        .iter()
        .map(|record| item(config, record, renderer))
        .collect::<Result<Vec<Item>>>()?;

    Ok(Channel {
        title: config.site_name.to_owned(),
        link: absolute(config.site_url, FEED_PATH),
        description: config.site_description.to_owned(),
        image: Some(Image {
            url: absolute(config.site_url, config.site_logo),
            title: format!("{} logo", config.site_name),
            link: config.site_url.to_string(),
            ..Default::default()
        }),
        last_build_date: Some(build_date(now)),
        pub_date: Some(rss_date(&latest.date)?),
        items,
        ..Default::default()
    })
}

fn item(config: &FeedConfig, record: &Record, renderer: &dyn Renderer) -> Result<Item> {
    let description = renderer
        .fragment(&record.source_path)
        .map_err(|err| Error::Render {
            path: record.source_path.clone(),
            err,
        })?;
    let link = absolute(config.site_url, &record.output_path);
    Ok(Item {
        title: Some(record.title.clone()),
        link: Some(link.clone()),
        description: Some(description),
        guid: Some(Guid {
            value: link,
            permalink: true,
        }),
        pub_date: Some(rss_date(&record.date)?),
        ..Default::default()
    })
}

/// Serializes `channel` and writes it to [`FEED_PATH`].
pub fn write_feed(channel: &Channel, writer: &Writer) -> Result<PathBuf> {
    let xml = channel.write_to(Vec::new())?;
    let path = writer.write_bytes(FEED_PATH, &xml)?;
    log::info!("Build rss feed -> {}", path.display());
    Ok(path)
}

/// Formats a `YYYY/MM/DD` date as an RFC-822 date at midnight UTC.
pub fn rss_date(date: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|err| Error::Date {
        date: date.to_owned(),
        err,
    })?;
    Ok(date.format("%a, %d %b %Y 00:00:00 +0000").to_string())
}

/// Formats a timestamp as an RFC-822 date in UTC.
pub fn build_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// Joins a root-relative path onto the site URL. A plain [`Url::join`] would
/// drop the last segment of a site URL without a trailing slash.
fn absolute(site_url: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        site_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when there are no records: an empty feed has no publication
    /// date.
    #[error("cannot build a feed without any posts")]
    Empty,

    /// Returned when an item's description can't be rendered.
    #[error("rendering feed description for `{}`: {err}", path.display())]
    Render { path: PathBuf, err: render::Error },

    /// Returned when there is an issue parsing a record's date.
    #[error("invalid date `{date}`: {err}")]
    Date {
        date: String,
        err: chrono::ParseError,
    },

    /// Returned when the channel can't be serialized.
    #[error("serializing feed: {0}")]
    Rss(#[from] rss::Error),

    #[error(transparent)]
    Write(#[from] write::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::record;
    use crate::render::{Document, RenderContext};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    struct Fragments;

    impl Renderer for Fragments {
        fn fragment(&self, source: &Path) -> render::Result<String> {
            Ok(format!("<p>body of <em>{}</em> &amp; more</p>", source.display()))
        }

        fn page(&self, _: &Document, _: &RenderContext) -> render::Result<String> {
            unreachable!("feeds never render pages")
        }
    }

    fn site_url() -> Url {
        Url::parse("https://example.org/blog").unwrap()
    }

    fn config(site_url: &Url) -> FeedConfig<'_> {
        FeedConfig {
            site_name: "Example",
            site_url,
            site_description: "An example site",
            site_logo: "img/logo.png",
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap()
    }

    #[test]
    fn test_rss_date() -> Result<()> {
        assert_eq!("Wed, 10 Jan 2024 00:00:00 +0000", rss_date("2024/01/10")?);
        assert_eq!("Thu, 01 Jun 2023 00:00:00 +0000", rss_date("2023/06/01")?);
        assert!(matches!(rss_date("2024-01-10"), Err(Error::Date { .. })));
        Ok(())
    }

    #[test]
    fn test_build_date() {
        assert_eq!("Sat, 03 Feb 2024 04:05:06 +0000", build_date(now()));
    }

    #[test]
    fn test_empty_feed() {
        let site_url = site_url();
        assert!(matches!(
            build_feed(&config(&site_url), &[], &Fragments, now()),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn test_build_feed() -> Result<()> {
        let site_url = site_url();
        let records = vec![
            record("Newest", "2024/01/10", "blog", &["a", "b"]),
            record("Oldest", "2023/06/01", "notes", &["a"]),
        ];
        let sorted: Vec<&Record> = records.iter().collect();
        let channel = build_feed(&config(&site_url), &sorted, &Fragments, now())?;

        assert_eq!("Example", channel.title);
        assert_eq!("https://example.org/blog/feed.xml", channel.link);
        assert_eq!("An example site", channel.description);
        assert_eq!(Some("Wed, 10 Jan 2024 00:00:00 +0000"), channel.pub_date.as_deref());
        assert_eq!(Some("Sat, 03 Feb 2024 04:05:06 +0000"), channel.last_build_date.as_deref());

        let image = channel.image.as_ref().unwrap();
        assert_eq!("https://example.org/blog/img/logo.png", image.url);
        assert_eq!("Example logo", image.title);

        let titles: Vec<&str> = channel.items.iter().filter_map(|i| i.title.as_deref()).collect();
        assert_eq!(vec!["Newest", "Oldest"], titles);

        let first = &channel.items[0];
        assert_eq!(
            Some("https://example.org/blog/2024/01/10/blog/newest.html"),
            first.link.as_deref()
        );
        assert_eq!(first.link.as_deref(), first.guid.as_ref().map(|g| g.value.as_str()));
        assert_eq!(
            Some("<p>body of <em>/src/posts/blog/newest.md</em> &amp; more</p>"),
            first.description.as_deref()
        );
        Ok(())
    }

    #[test]
    fn test_descriptions_survive_serialization() -> Result<()> {
        let site_url = site_url();
        let records = vec![record("Only", "2024/01/10", "blog", &[])];
        let sorted: Vec<&Record> = records.iter().collect();
        let channel = build_feed(&config(&site_url), &sorted, &Fragments, now())?;

        let xml = channel.write_to(Vec::new())?;
        let parsed = Channel::read_from(&xml[..])?;
        assert_eq!(1, parsed.items.len());
        assert_eq!(channel.items[0].description, parsed.items[0].description);
        assert_eq!(channel.pub_date, parsed.pub_date);
        Ok(())
    }
}
