//! Support for creating the RSS 2.0 (`feed.xml`) and Atom (`atom.xml`) feeds
//! from the post index.

use crate::config::Site;
use crate::index::PostIndex;
use crate::route::build_article_path;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Utc};
use rss::{Channel, ChannelBuilder, Error as RssError, GuidBuilder, ItemBuilder};
use std::fmt;
use std::io::Write;

/// A post as it appears in either feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub site: &'a Site,

    /// Stamped on undated entries and on an Atom feed with no dated entries.
    pub now: DateTime<Utc>,
}

/// One item per post, newest first, undated posts last. Titles fall back to
/// the raw slug.
pub fn feed_items(site_url: &str, index: &PostIndex) -> Vec<FeedItem> {
    index
        .posts()
        .iter()
        .map(|post| FeedItem {
            title: post.title().to_owned(),
            url: format!("{}{}", site_url, build_article_path(post)),
            description: post
                .frontmatter
                .description
                .clone()
                .filter(|d| !d.is_empty()),
            author: post.frontmatter.author.clone(),
            date: post.effective_date(),
        })
        .collect()
}

/// Builds the RSS channel.
pub fn rss(config: &FeedConfig, items: &[FeedItem]) -> Channel {
    let items: Vec<rss::Item> = items
        .iter()
        .map(|item| {
            ItemBuilder::default()
                .title(item.title.clone())
                .link(Some(item.url.clone()))
                .guid(
                    GuidBuilder::default()
                        .permalink(true)
                        .value(item.url.clone())
                        .build(),
                )
                .pub_date(item.date.map(|d| d.to_rfc2822()))
                .description(item.description.clone())
                .build()
        })
        .collect();

    ChannelBuilder::default()
        .title(&config.site.name)
        .link(&config.site.url)
        .description(&config.site.description)
        .language(Some(config.site.language.clone()))
        .items(items)
        .build()
}

/// Builds the Atom feed. The feed's `updated` is the newest dated entry, or
/// `config.now` when nothing is dated.
pub fn atom(config: &FeedConfig, items: &[FeedItem]) -> Feed {
    let site_url = &config.site.url;
    let updated = items
        .iter()
        .find_map(|item| item.date)
        .unwrap_or(config.now);

    let mut feed = Feed::default();
    feed.set_title(config.site.name.clone());
    feed.set_id(site_url.as_str());
    feed.set_updated(updated);
    feed.set_links(vec![
        link(site_url, "alternate", None),
        link(
            &format!("{}/atom.xml", site_url),
            "self",
            Some("application/atom+xml"),
        ),
    ]);
    feed.set_entries(
        items
            .iter()
            .map(|item| {
                let mut entry = Entry::default();
                entry.set_title(item.title.clone());
                entry.set_id(item.url.as_str());
                entry.set_updated(item.date.unwrap_or(config.now));
                entry.set_published(item.date.map(DateTime::<FixedOffset>::from));
                entry.set_links(vec![link(&item.url, "alternate", None)]);
                entry.set_summary(item.description.as_deref().map(Text::plain));
                entry.set_authors(author_to_people(item.author.as_deref()));
                entry
            })
            .collect::<Vec<Entry>>(),
    );
    feed
}

/// Writes the RSS document for `index` to `w`.
pub fn write_rss<W: Write>(config: &FeedConfig, index: &PostIndex, w: W) -> Result<()> {
    rss(config, &feed_items(&config.site.url, index)).write_to(w)?;
    Ok(())
}

/// Writes the Atom document for `index` to `w`.
pub fn write_atom<W: Write>(config: &FeedConfig, index: &PostIndex, w: W) -> Result<()> {
    atom(config, &feed_items(&config.site.url, index)).write_to(w)?;
    Ok(())
}

fn link(href: &str, rel: &str, mime_type: Option<&str>) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel(rel);
    link.set_mime_type(mime_type.map(str::to_owned));
    link
}

fn author_to_people(author: Option<&str>) -> Vec<Person> {
    match author {
        Some(name) if !name.is_empty() => vec![Person {
            name: name.to_owned(),
            email: None,
            uri: None,
        }],
        _ => Vec::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing a feed. Variants include I/O, Atom, and RSS
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),

    /// Returned when there is an RSS-related error.
    Rss(RssError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => fmt::Display::fmt(err, f),
            Error::Atom(err) => fmt::Display::fmt(err, f),
            Error::Rss(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
            Error::Rss(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`].
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`].
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

impl From<RssError> for Error {
    /// Converts [`RssError`]s into [`Error`].
    fn from(err: RssError) -> Error {
        Error::Rss(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SiteConfigFile;
    use crate::env::Env;
    use crate::index::test::post;

    fn site() -> Site {
        let env: Env = vec![
            ("SITE_URL", "https://blog.dev/"),
            ("VITE_SITE_NAME", "Notes & Things"),
            ("VITE_SITE_DESCRIPTION", "A blog"),
        ]
        .into_iter()
        .collect();
        Site::resolve(SiteConfigFile::default(), &env).unwrap()
    }

    fn index() -> PostIndex {
        let mut described = post("技术", "入门", Some("2024-01-01"));
        described.frontmatter.description = Some("Getting started".to_owned());
        let mut untitled = post("life", "draft", None);
        untitled.frontmatter.title = None;
        PostIndex::from_posts(vec![
            untitled,
            described,
            post("life", "hello", Some("2024-02-01")),
        ])
    }

    fn now() -> DateTime<Utc> {
        "2025-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_feed_items_newest_first() {
        let items = feed_items("https://blog.dev", &index());
        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            vec![
                "https://blog.dev/article/life/hello",
                "https://blog.dev/article/jishu/rumen",
                "https://blog.dev/article/life/draft",
            ],
            urls
        );
        assert_eq!("draft", items[2].title);
        assert_eq!(Some("Getting started"), items[1].description.as_deref());
    }

    #[test]
    fn test_rss() {
        let site = site();
        let config = FeedConfig { site: &site, now: now() };
        let channel = rss(&config, &feed_items(&site.url, &index()));
        assert_eq!("Notes & Things", channel.title());
        assert_eq!("https://blog.dev", channel.link());
        assert_eq!(Some("zh-CN"), channel.language());
        assert_eq!(3, channel.items().len());

        let first = &channel.items()[0];
        assert_eq!(Some("https://blog.dev/article/life/hello"), first.link());
        assert!(first
            .pub_date()
            .map_or(false, |d| d.starts_with("Thu,") && d.ends_with("Feb 2024 00:00:00 +0000")));
        assert_eq!(None, channel.items()[2].pub_date());

        let xml = channel.to_string();
        assert!(xml.contains("<title>Notes &amp; Things</title>"));
    }

    #[test]
    fn test_atom() {
        let site = site();
        let config = FeedConfig { site: &site, now: now() };
        let feed = atom(&config, &feed_items(&site.url, &index()));
        assert_eq!("https://blog.dev", feed.id());
        assert_eq!("2024-02-01T00:00:00+00:00", feed.updated().to_rfc3339());
        assert_eq!("self", feed.links()[1].rel());
        assert_eq!("https://blog.dev/atom.xml", feed.links()[1].href());

        let entries = feed.entries();
        assert_eq!(3, entries.len());
        assert_eq!(
            Some("Getting started"),
            entries[1].summary().map(|s| s.value.as_str())
        );
        assert_eq!(now(), *entries[2].updated());
        assert_eq!(None, entries[2].published());
    }

    #[test]
    fn test_atom_without_dates_uses_now() {
        let site = site();
        let config = FeedConfig { site: &site, now: now() };
        let index = PostIndex::from_posts(vec![post("life", "draft", None)]);
        let feed = atom(&config, &feed_items(&site.url, &index));
        assert_eq!(now(), *feed.updated());
    }

    #[test]
    fn test_write_feeds() -> Result<()> {
        let site = site();
        let config = FeedConfig { site: &site, now: now() };
        let mut rss_out = Vec::new();
        write_rss(&config, &index(), &mut rss_out)?;
        let mut atom_out = Vec::new();
        write_atom(&config, &index(), &mut atom_out)?;

        let rss_xml = String::from_utf8_lossy(&rss_out);
        assert!(rss_xml.contains("<rss"));
        assert!(rss_xml.contains("https://blog.dev/article/jishu/rumen"));
        let atom_xml = String::from_utf8_lossy(&atom_out);
        assert!(atom_xml.contains("<feed"));
        assert!(atom_xml.contains("rel=\"self\""));
        Ok(())
    }
}
