//! Defines the category tags shown on `/tags/{category_slug}` pages and the
//! per-tag presentation metadata configured in `site.config.json`.

use crate::index::PostIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The slug of the pseudo-category that lists every post.
pub const ALL_TAG_SLUG: &str = "all";

/// The label shown for [`ALL_TAG_SLUG`].
pub const ALL_TAG_LABEL: &str = "All";

pub const DEFAULT_TAG_COLOR: &str = "#9ca3af";

/// A category as shown in the tag bar: the raw name and its slug.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    pub label: String,
    pub slug: String,
}

/// One entry per distinct category slug, in index order. When two categories
/// share a slug the first one's label is kept.
pub fn tag_entries(index: &PostIndex) -> Vec<TagEntry> {
    let mut seen = HashSet::new();
    index
        .posts()
        .iter()
        .filter(|post| seen.insert(post.category_slug.as_str()))
        .map(|post| TagEntry {
            label: post.category.clone(),
            slug: post.category_slug.clone(),
        })
        .collect()
}

/// The tab list for the tags page: `all` followed by [`tag_entries`].
pub fn tag_tabs(index: &PostIndex) -> Vec<TagEntry> {
    let mut tabs = vec![TagEntry {
        label: ALL_TAG_LABEL.to_owned(),
        slug: ALL_TAG_SLUG.to_owned(),
    }];
    tabs.extend(tag_entries(index));
    tabs
}

/// Posts listed under `category_slug`; every post for [`ALL_TAG_SLUG`].
pub fn posts_for_tag<'a>(
    index: &'a PostIndex,
    category_slug: &'a str,
) -> impl Iterator<Item = &'a crate::index::PostMeta> + 'a {
    index
        .posts()
        .iter()
        .filter(move |post| category_slug == ALL_TAG_SLUG || post.category_slug == category_slug)
}

/// Per-tag overrides as written in `site.config.json` under `tagMeta`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TagMetaConfig {
    pub color: Option<String>,
    pub cover: Option<String>,
    pub description: Option<String>,
}

/// Resolved presentation metadata for a tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagMeta {
    pub color: String,
    pub cover: Option<String>,
    pub description: Option<String>,
}

/// Tag colors and metadata from the site config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagStyles {
    pub default_color: String,

    /// Keyed by tag label with whitespace removed.
    pub colors: HashMap<String, String>,

    /// Keyed by tag label.
    pub meta: HashMap<String, TagMetaConfig>,
}

impl Default for TagStyles {
    fn default() -> Self {
        TagStyles {
            default_color: DEFAULT_TAG_COLOR.to_owned(),
            colors: HashMap::new(),
            meta: HashMap::new(),
        }
    }
}

impl TagStyles {
    /// The color for `label`. Whitespace in the label is ignored, so
    /// `Node js` and `Nodejs` share a color.
    pub fn color(&self, label: &str) -> &str {
        let normalized: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        self.colors
            .get(&normalized)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }

    /// Everything configured for `label`. A `tagMeta` color beats
    /// `tagColors`, which beats the default.
    pub fn meta(&self, label: &str) -> TagMeta {
        let configured = self.meta.get(label).cloned().unwrap_or_default();
        TagMeta {
            color: configured
                .color
                .unwrap_or_else(|| self.color(label).to_owned()),
            cover: configured.cover,
            description: configured.description,
        }
    }
}
