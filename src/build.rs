//! Exports the [`build_site`] function which stitches together the high-level
//! steps of the post-build SEO pass: indexing the posts ([`crate::index`]),
//! writing the index snapshot, sitemap, robots file and feeds into the output
//! directory, and patching the generated HTML ([`crate::noscript`]).

use crate::config::Config;
use crate::feed::{write_atom, write_rss, Error as FeedError, FeedConfig};
use crate::index::{Error as IndexError, PostIndex, SlugCollision};
use crate::noscript::{Error as NoscriptError, NoscriptInjector};
use crate::sitemap::{robots, sitemap};
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const POSTS_META_FILE: &str = "posts-meta.json";
pub const SITEMAP_FILE: &str = "sitemap.xml";
pub const ROBOTS_FILE: &str = "robots.txt";
pub const RSS_FILE: &str = "feed.xml";
pub const ATOM_FILE: &str = "atom.xml";

/// Knobs for a single [`build_site`] run.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Fail instead of warning when two posts share a slug pair.
    pub deny_collisions: bool,

    /// The build time, used for undated feed entries.
    pub now: DateTime<Utc>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            deny_collisions: false,
            now: Utc::now(),
        }
    }
}

/// What a build produced.
#[derive(Debug)]
pub struct BuildReport {
    pub index: PostIndex,

    /// Every file written, in write order.
    pub written: Vec<PathBuf>,

    /// HTML files that received `<noscript>` fallbacks.
    pub patched: Vec<PathBuf>,

    pub collisions: Vec<SlugCollision>,
}

/// Builds the SEO artifacts from a [`Config`]. The output directory must
/// already exist (it is created by the front-end build); everything this
/// function writes goes into it.
pub fn build_site(config: &Config, options: &BuildOptions) -> Result<BuildReport> {
    let out = &config.output_directory;
    if !out.is_dir() {
        return Err(Error::MissingOutputDirectory(out.clone()));
    }

    let index = PostIndex::build(&config.posts_source_directory)?;
    let collisions = index.slug_collisions();
    for collision in &collisions {
        warn!(key = %collision.key, ids = ?collision.ids, "Slug collision; only the first post is reachable");
    }
    if options.deny_collisions && !collisions.is_empty() {
        return Err(Error::SlugCollision(collisions));
    }

    let site = &config.site;
    let mut written = Vec::new();

    written.push(write_file(out, POSTS_META_FILE, &index.to_json()?)?);
    written.push(write_file(out, SITEMAP_FILE, &sitemap(&site.url, &index))?);
    written.push(write_file(out, ROBOTS_FILE, &robots(&site.url))?);

    let feed_config = FeedConfig {
        site,
        now: options.now,
    };
    let rss_path = out.join(RSS_FILE);
    write_rss(&feed_config, &index, BufWriter::new(create(&rss_path)?))?;
    written.push(rss_path);
    let atom_path = out.join(ATOM_FILE);
    write_atom(&feed_config, &index, BufWriter::new(create(&atom_path)?))?;
    written.push(atom_path);

    let patched = NoscriptInjector::new()?.patch_dir(out)?;

    info!(
        posts = index.len(),
        written = written.len(),
        patched = patched.len(),
        "Generated SEO artifacts"
    );
    Ok(BuildReport {
        index,
        written,
        patched,
        collisions,
    })
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents).map_err(|err| Error::Write {
        path: path.clone(),
        err,
    })?;
    Ok(path)
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during indexing, feed
/// generation, HTML patching, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned when the output directory hasn't been created yet.
    MissingOutputDirectory(PathBuf),

    /// Returned for errors scanning or reading posts.
    Index(IndexError),

    /// Returned when collisions are denied and some were found.
    SlugCollision(Vec<SlugCollision>),

    /// Returned for errors writing the feeds.
    Feed(FeedError),

    /// Returned for errors patching HTML files.
    Noscript(NoscriptError),

    /// Returned for I/O problems writing an artifact.
    Write { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingOutputDirectory(path) => write!(
                f,
                "output directory '{}' not found, run the site build first",
                path.display()
            ),
            Error::Index(err) => fmt::Display::fmt(err, f),
            Error::SlugCollision(collisions) => {
                write!(f, "{} slug collision(s): ", collisions.len())?;
                for (i, collision) in collisions.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    fmt::Display::fmt(collision, f)?;
                }
                Ok(())
            }
            Error::Feed(err) => fmt::Display::fmt(err, f),
            Error::Noscript(err) => fmt::Display::fmt(err, f),
            Error::Write { path, err } => {
                write!(f, "Writing '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingOutputDirectory(_) => None,
            Error::Index(err) => Some(err),
            Error::SlugCollision(_) => None,
            Error::Feed(err) => Some(err),
            Error::Noscript(err) => Some(err),
            Error::Write { path: _, err } => Some(err),
        }
    }
}

impl From<IndexError> for Error {
    /// Converts [`IndexError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: IndexError) -> Error {
        Error::Index(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

impl From<NoscriptError> for Error {
    /// Converts [`NoscriptError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: NoscriptError) -> Error {
        Error::Noscript(err)
    }
}
