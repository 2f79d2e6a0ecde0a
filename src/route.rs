//! Maps between posts and the blog's route surface:
//!
//! * `/` - home
//! * `/article/{category_slug}/{slug}` - a post
//! * `/tags/{category_slug}` - posts in a category, including the `all`
//!   pseudo-category
//! * anything else - not found
//!
//! [`RouteTable`] decides whether a route is reachable with set lookups;
//! [`find_post_by_slug`] decides which post a reachable route shows.

use crate::index::{PostIndex, PostMeta};
use crate::tag::ALL_TAG_SLUG;
use std::borrow::Cow;
use std::collections::HashSet;

const ARTICLE_PREFIX: &str = "/article/";
const TAGS_PREFIX: &str = "/tags/";

/// Formats a post's public path: `/article/{category_slug}/{slug}`.
pub fn build_article_path(post: &PostMeta) -> String {
    format!("{}{}/{}", ARTICLE_PREFIX, post.category_slug, post.slug)
}

/// Formats a category's listing path: `/tags/{category_slug}`.
pub fn build_tag_path(category_slug: &str) -> String {
    format!("{}{}", TAGS_PREFIX, category_slug)
}

/// Returns the first post in `posts` whose transliterated slugs match. When
/// two posts transliterate to the same pair the earlier one wins; see
/// [`PostIndex::slug_collisions`].
pub fn find_post_by_slug<'a>(
    category_slug: &str,
    article_slug: &str,
    posts: &'a [PostMeta],
) -> Option<&'a PostMeta> {
    posts
        .iter()
        .find(|post| post.category_slug == category_slug && post.slug == article_slug)
}

/// A matched route. Parameters are percent-decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Article {
        category_slug: String,
        article_slug: String,
    },
    Tags {
        category_slug: String,
    },
    NotFound,
}

/// The set of reachable article and category routes, computed once from an
/// index.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    /// `{category_slug}/{slug}` keys.
    articles: HashSet<String>,
    categories: HashSet<String>,
}

impl RouteTable {
    pub fn from_index(index: &PostIndex) -> RouteTable {
        let mut table = RouteTable::default();
        for post in index.posts() {
            table
                .articles
                .insert(format!("{}/{}", post.category_slug, post.slug));
            table.categories.insert(post.category_slug.clone());
        }
        table
    }

    pub fn has_article(&self, category_slug: &str, article_slug: &str) -> bool {
        self.articles
            .contains(&format!("{}/{}", category_slug, article_slug))
    }

    /// `all` is always a valid category.
    pub fn has_category(&self, category_slug: &str) -> bool {
        category_slug == ALL_TAG_SLUG || self.categories.contains(category_slug)
    }

    /// Matches `path` against the route surface and applies the guard:
    /// article and tag routes whose parameters aren't in the table resolve to
    /// [`Route::NotFound`]. A query string or fragment is ignored.
    pub fn resolve(&self, path: &str) -> Route {
        let path = path
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or("");
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        if path == "/" || path.is_empty() {
            return Route::Home;
        }

        if let Some(rest) = path.strip_prefix(ARTICLE_PREFIX) {
            return match split_params(rest) {
                Some([category, article]) => {
                    let category_slug = decode_param(category).into_owned();
                    let article_slug = decode_param(article).into_owned();
                    if self.has_article(&category_slug, &article_slug) {
                        Route::Article {
                            category_slug,
                            article_slug,
                        }
                    } else {
                        Route::NotFound
                    }
                }
                _ => Route::NotFound,
            };
        }

        if let Some(rest) = path.strip_prefix(TAGS_PREFIX) {
            if rest.is_empty() || rest.contains('/') {
                return Route::NotFound;
            }
            let category_slug = decode_param(rest).into_owned();
            return if self.has_category(&category_slug) {
                Route::Tags { category_slug }
            } else {
                Route::NotFound
            };
        }

        Route::NotFound
    }
}

fn split_params(rest: &str) -> Option<[&str; 2]> {
    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) if !a.is_empty() && !b.is_empty() => Some([a, b]),
        _ => None,
    }
}

/// Percent-decodes a route parameter, keeping the raw text when it isn't a
/// valid encoding.
pub fn decode_param(param: &str) -> Cow<'_, str> {
    match urlencoding::decode(param) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(param),
    }
}

/// Every route to pre-render: home, each article, the `all` listing and one
/// listing per category, in index order.
pub fn ssg_routes(index: &PostIndex) -> Vec<String> {
    let mut routes = vec![String::from("/")];
    routes.extend(index.posts().iter().map(build_article_path));
    routes.push(build_tag_path(ALL_TAG_SLUG));

    let mut seen = HashSet::new();
    for post in index.posts() {
        if seen.insert(post.category_slug.as_str()) {
            routes.push(build_tag_path(&post.category_slug));
        }
    }
    routes
}
