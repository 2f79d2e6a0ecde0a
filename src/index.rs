//! Defines [`PostMeta`] and [`PostIndex`], the immutable, date-sorted index of
//! every post in the content directory. The index is built once per build (or
//! per content change via [`PostIndex::rebuild`]) and shared by reference with
//! the router, the content loader and the emitters.

use crate::date;
use crate::frontmatter::Frontmatter;
use crate::post::{self, list_post_files, PostFileEntry};
use crate::route;
use crate::slug::to_slug;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Metadata for one post, derived deterministically from its
/// [`PostFileEntry`] and [`Frontmatter`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMeta {
    /// `{category}/{slug}` using the raw, untransliterated names. Unique
    /// across the index because it mirrors the directory structure.
    pub id: String,

    /// The raw category directory name.
    pub category: String,

    /// [`to_slug`] of `category`.
    pub category_slug: String,

    /// [`to_slug`] of the file name less its extension.
    pub slug: String,

    /// The public path the raw source is served from:
    /// `/posts/{category}/{file_name}`.
    pub path: String,

    pub frontmatter: Frontmatter,
}

impl PostMeta {
    /// Joins a scanned file with its parsed frontmatter.
    pub fn new(entry: &PostFileEntry, frontmatter: Frontmatter) -> PostMeta {
        PostMeta {
            id: format!("{}/{}", entry.category, entry.slug),
            category: entry.category.clone(),
            category_slug: to_slug(&entry.category),
            slug: to_slug(&entry.slug),
            path: format!("/posts/{}/{}", entry.category, entry.file_name),
            frontmatter,
        }
    }

    /// The first parsable of the `date` and `publishDate` frontmatter fields.
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        let frontmatter = &self.frontmatter;
        frontmatter
            .date
            .as_deref()
            .and_then(date::parse)
            .or_else(|| frontmatter.publish_date.as_deref().and_then(date::parse))
    }

    /// The frontmatter title, or the raw file name when the post has none.
    pub fn title(&self) -> &str {
        match self.frontmatter.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => self.raw_slug(),
        }
    }

    /// The untransliterated file stem, recovered from `id`.
    pub fn raw_slug(&self) -> &str {
        self.id
            .strip_prefix(&self.category)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.id)
    }

    /// `/article/{category_slug}/{slug}`.
    pub fn article_path(&self) -> String {
        route::build_article_path(self)
    }
}

/// Aggregate counts over an index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub total_posts: usize,
    pub total_categories: usize,
    pub total_tags: usize,
    pub total_words: u64,
}

/// Two or more posts whose `(category_slug, slug)` pairs are identical even
/// though their canonical ids differ. Only the first (in index order) is
/// reachable by slug.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlugCollision {
    /// The shared `{category_slug}/{slug}` key.
    pub key: String,

    /// The canonical ids, in index order.
    pub ids: Vec<String>,
}

impl fmt::Display for SlugCollision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}` is shared by {}", self.key, self.ids.join(", "))
    }
}

/// The sorted, read-only post index.
#[derive(Clone, Debug, Default)]
pub struct PostIndex {
    posts: Vec<PostMeta>,
    by_id: HashMap<String, usize>,
}

impl PostIndex {
    /// Scans `content_root`, reads and parses every post, and returns the
    /// sorted index. Unreadable files abort the build; malformed frontmatter
    /// does not (see [`Frontmatter::parse_lenient`]).
    pub fn build(content_root: &Path) -> Result<PostIndex> {
        let entries = list_post_files(content_root)?;
        let index = PostIndex::from_entries(&entries)?;
        info!(
            posts = index.len(),
            root = %content_root.display(),
            "Indexed posts"
        );
        Ok(index)
    }

    /// Reads each entry's source file and builds the index from it.
    pub fn from_entries(entries: &[PostFileEntry]) -> Result<PostIndex> {
        let mut posts = Vec::with_capacity(entries.len());
        for entry in entries {
            let contents = std::fs::read_to_string(&entry.file_path).map_err(|err| Error::Read {
                path: entry.file_path.clone(),
                err,
            })?;
            let (frontmatter, _) =
                Frontmatter::parse_lenient(&entry.file_path.to_string_lossy(), &contents);
            debug!(category = %entry.category, slug = %entry.slug, "Parsed post");
            posts.push(PostMeta::new(entry, frontmatter));
        }
        Ok(PostIndex::from_posts(posts))
    }

    /// Sorts `posts` newest first and indexes them by id. The sort is stable:
    /// posts with equal dates keep their input order, and posts with no
    /// parsable date go last in input order.
    pub fn from_posts(posts: Vec<PostMeta>) -> PostIndex {
        let mut keyed: Vec<(Option<DateTime<Utc>>, PostMeta)> = posts
            .into_iter()
            .map(|post| (post.effective_date(), post))
            .collect();
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        let posts: Vec<PostMeta> = keyed.into_iter().map(|(_, post)| post).collect();

        let by_id = posts
            .iter()
            .enumerate()
            .map(|(i, post)| (post.id.clone(), i))
            .collect();
        PostIndex { posts, by_id }
    }

    /// Throws the index away and builds a fresh one from `content_root`.
    /// There is no incremental update.
    pub fn rebuild(&mut self, content_root: &Path) -> Result<()> {
        *self = PostIndex::build(content_root)?;
        Ok(())
    }

    /// All posts, newest first.
    pub fn posts(&self) -> &[PostMeta] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Looks up a post by canonical id.
    pub fn get(&self, id: &str) -> Option<&PostMeta> {
        self.by_id.get(id).map(|&i| &self.posts[i])
    }

    pub fn has_post(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Posts whose raw category is `category`, newest first.
    pub fn posts_by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a PostMeta> + 'a {
        self.posts.iter().filter(move |post| post.category == category)
    }

    /// Distinct raw categories in index order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.posts
            .iter()
            .map(|post| post.category.as_str())
            .filter(|category| seen.insert(*category))
            .collect()
    }

    /// Maps a router's slug params back to the canonical id. First match in
    /// index order wins when slugs collide.
    pub fn resolve_post_id_by_slug(&self, category_slug: &str, article_slug: &str) -> Option<&str> {
        route::find_post_by_slug(category_slug, article_slug, &self.posts).map(|post| post.id.as_str())
    }

    pub fn stats(&self) -> IndexStats {
        let tags: HashSet<&str> = self
            .posts
            .iter()
            .flat_map(|post| post.frontmatter.tags.iter().map(String::as_str))
            .collect();
        IndexStats {
            total_posts: self.posts.len(),
            total_categories: self.categories().len(),
            total_tags: tags.len(),
            total_words: self
                .posts
                .iter()
                .filter_map(|post| post.frontmatter.word_count)
                .sum(),
        }
    }

    /// Every `(category_slug, slug)` pair claimed by more than one post.
    /// Collisions are ordered by where their first post appears.
    pub fn slug_collisions(&self) -> Vec<SlugCollision> {
        let mut groups: Vec<SlugCollision> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for post in &self.posts {
            let key = format!("{}/{}", post.category_slug, post.slug);
            match positions.get(&key) {
                Some(&i) => groups[i].ids.push(post.id.clone()),
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push(SlugCollision {
                        key,
                        ids: vec![post.id.clone()],
                    });
                }
            }
        }
        groups.retain(|group| group.ids.len() > 1);
        groups
    }

    /// Serializes the index as the JSON array the client bundle consumes:
    /// `[{id, category, categorySlug, slug, path, frontmatter}]`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.posts)?)
    }
}

/// Represents the result of an index-building operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building a [`PostIndex`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the content directory couldn't be scanned.
    Scan(post::Error),

    /// Returned when a post source file couldn't be read.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when the index couldn't be serialized.
    Serialize(serde_json::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Scan(err) => write!(f, "scanning posts: {}", err),
            Error::Read { path, err } => {
                write!(f, "reading post '{}': {}", path.display(), err)
            }
            Error::Serialize(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scan(err) => Some(err),
            Error::Read { path: _, err } => Some(err),
            Error::Serialize(err) => Some(err),
        }
    }
}

impl From<post::Error> for Error {
    fn from(err: post::Error) -> Error {
        Error::Scan(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Serialize(err)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Builds a [`PostMeta`] without touching the file system.
    pub(crate) fn post(category: &str, slug: &str, date: Option<&str>) -> PostMeta {
        let entry = PostFileEntry {
            category: category.to_owned(),
            slug: slug.to_owned(),
            file_name: format!("{}.md", slug),
            file_path: PathBuf::from(format!("posts/{}/{}.md", category, slug)),
        };
        let frontmatter = Frontmatter {
            title: Some(format!("Title of {}", slug)),
            date: date.map(str::to_owned),
            ..Frontmatter::default()
        };
        PostMeta::new(&entry, frontmatter)
    }

    fn ids(index: &PostIndex) -> Vec<&str> {
        index.posts().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_post_meta_fields() {
        let post = post("技术", "入门", Some("2024-01-01"));
        assert_eq!("技术/入门", post.id);
        assert_eq!("jishu", post.category_slug);
        assert_eq!("rumen", post.slug);
        assert_eq!("/posts/技术/入门.md", post.path);
        assert_eq!("入门", post.raw_slug());
        assert_eq!("/article/jishu/rumen", post.article_path());
    }

    #[test]
    fn test_sorted_newest_first() {
        let index = PostIndex::from_posts(vec![
            post("a", "old", Some("2023-01-01")),
            post("a", "new", Some("2024-06-01")),
            post("a", "mid", Some("2024-01-01")),
        ]);
        assert_eq!(vec!["a/new", "a/mid", "a/old"], ids(&index));
    }

    #[test]
    fn test_equal_dates_keep_input_order() {
        let index = PostIndex::from_posts(vec![
            post("a", "B", Some("2024-02-01")),
            post("a", "A", Some("2024-02-01")),
        ]);
        assert_eq!(vec!["a/B", "a/A"], ids(&index));
    }

    #[test]
    fn test_undated_posts_sort_last() {
        let index = PostIndex::from_posts(vec![
            post("a", "aaa-undated", None),
            post("a", "garbage", Some("not a date")),
            post("a", "ancient", Some("1900-01-01")),
            post("a", "dated", Some("2024-01-01")),
        ]);
        assert_eq!(
            vec!["a/dated", "a/ancient", "a/aaa-undated", "a/garbage"],
            ids(&index)
        );
    }

    #[test]
    fn test_publish_date_fallback() {
        let mut fallback = post("a", "fallback", None);
        fallback.frontmatter.publish_date = Some("2025-01-01".to_owned());
        let index = PostIndex::from_posts(vec![post("a", "dated", Some("2024-01-01")), fallback]);
        assert_eq!(vec!["a/fallback", "a/dated"], ids(&index));
    }

    #[test]
    fn test_lookups() {
        let index = PostIndex::from_posts(vec![
            post("技术", "入门", Some("2024-01-01")),
            post("life", "hello", Some("2024-02-01")),
            post("技术", "进阶", Some("2024-03-01")),
        ]);
        assert!(index.has_post("技术/入门"));
        assert!(!index.has_post("jishu/rumen"));
        assert_eq!(Some("hello"), index.get("life/hello").map(|p| p.slug.as_str()));
        assert_eq!(vec!["技术", "life"], index.categories());
        assert_eq!(
            vec!["技术/进阶", "技术/入门"],
            index.posts_by_category("技术").map(|p| p.id.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(Some("技术/入门"), index.resolve_post_id_by_slug("jishu", "rumen"));
        assert_eq!(None, index.resolve_post_id_by_slug("jishu", "missing"));
    }

    #[test]
    fn test_stats() {
        let mut a = post("a", "one", None);
        a.frontmatter.tags = vec!["rust".to_owned(), "ssg".to_owned()];
        a.frontmatter.word_count = Some(1200);
        let mut b = post("b", "two", None);
        b.frontmatter.tags = vec!["rust".to_owned()];
        b.frontmatter.word_count = Some(300);
        let index = PostIndex::from_posts(vec![a, b, post("b", "three", None)]);
        assert_eq!(
            IndexStats {
                total_posts: 3,
                total_categories: 2,
                total_tags: 2,
                total_words: 1500,
            },
            index.stats()
        );
    }

    #[test]
    fn test_slug_collisions() {
        let index = PostIndex::from_posts(vec![
            post("数据", "a", Some("2024-03-01")),
            post("书局", "a", Some("2024-02-01")),
            post("数据", "b", Some("2024-01-01")),
        ]);
        assert_eq!(
            vec![SlugCollision {
                key: "shuju/a".to_owned(),
                ids: vec!["数据/a".to_owned(), "书局/a".to_owned()],
            }],
            index.slug_collisions()
        );
        assert_eq!(Some("数据/a"), index.resolve_post_id_by_slug("shuju", "a"));
    }

    #[test]
    fn test_to_json_snapshot_shape() -> Result<()> {
        let index = PostIndex::from_posts(vec![post("技术", "入门", Some("2024-01-01"))]);
        let value: serde_json::Value = serde_json::from_str(&index.to_json()?)?;
        let first = &value[0];
        assert_eq!(first["id"], "技术/入门");
        assert_eq!(first["categorySlug"], "jishu");
        assert_eq!(first["slug"], "rumen");
        assert_eq!(first["path"], "/posts/技术/入门.md");
        assert_eq!(first["frontmatter"]["date"], "2024-01-01");
        Ok(())
    }

    #[test]
    fn test_build_and_rebuild_from_disk() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::create_dir_all(root.join("技术"))?;
        fs::write(
            root.join("技术/入门.md"),
            "---\ntitle: Intro\ndate: 2024-01-01\n---\nbody",
        )?;
        fs::write(root.join("技术/broken.md"), "---\ntitle: [oops\n---\n")?;

        let mut index = PostIndex::build(root)?;
        assert_eq!(vec!["技术/入门", "技术/broken"], ids(&index));
        assert_eq!(None, index.get("技术/broken").unwrap().frontmatter.title);
        assert_eq!("broken", index.get("技术/broken").unwrap().title());

        fs::remove_file(root.join("技术/broken.md"))?;
        index.rebuild(root)?;
        assert_eq!(vec!["技术/入门"], ids(&index));
        Ok(())
    }
}
