//! The library code for the `inkwell` blog indexer. The architecture can be
//! generally broken down into two distinct steps:
//!
//! 1. Indexing posts from source files on disk ([`crate::post`],
//!    [`crate::index`])
//! 2. Consuming the index, either to route requests to posts
//!    ([`crate::route`], [`crate::loader`]) or to emit build artifacts
//!    ([`crate::build`])
//!
//! Every post is addressed two ways. Its canonical id is
//! `{category}/{file stem}` using the raw names on disk, which may be Chinese.
//! Its public URL is `/article/{category_slug}/{slug}`, where both slugs are
//! derived by [`crate::slug::to_slug`], which transliterates Han characters to
//! pinyin. The index maps slugs back to ids.
//!
//! The build step writes `posts-meta.json`, `sitemap.xml`, `robots.txt`,
//! `feed.xml` and `atom.xml` into the front-end's output directory, then adds
//! `<noscript>` fallbacks for lazily loaded images in the generated HTML.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod date;
pub mod env;
pub mod feed;
pub mod frontmatter;
pub mod index;
pub mod loader;
pub mod markdown;
pub mod noscript;
pub mod post;
pub mod route;
pub mod sitemap;
pub mod slug;
pub mod tag;
