//! Builds `sitemap.xml` and `robots.txt` from the post index.

use crate::date;
use crate::index::PostIndex;
use crate::route::build_article_path;
use std::borrow::Cow;
use std::fmt::Write;

/// A single `<url>` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
}

/// The entries for the site: the root first, then one per post in index
/// order. `lastmod` is the post's effective date in ISO-8601, or absent.
pub fn sitemap_entries(site_url: &str, index: &PostIndex) -> Vec<SitemapEntry> {
    let mut entries = Vec::with_capacity(index.len() + 1);
    entries.push(SitemapEntry {
        loc: site_url.to_owned(),
        lastmod: None,
    });
    entries.extend(index.posts().iter().map(|post| SitemapEntry {
        loc: format!("{}{}", site_url, build_article_path(post)),
        lastmod: post.effective_date().map(|d| date::to_iso(&d)),
    }));
    entries
}

/// Renders the sitemap document.
pub fn sitemap(site_url: &str, index: &PostIndex) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in sitemap_entries(site_url, index) {
        // Writing into a String can't fail.
        let _ = write!(out, "  <url><loc>{}</loc>", escape_xml(&entry.loc));
        if let Some(lastmod) = &entry.lastmod {
            let _ = write!(out, "<lastmod>{}</lastmod>", lastmod);
        }
        out.push_str("</url>\n");
    }
    out.push_str("</urlset>\n");
    out
}

/// Renders `robots.txt`: allow everything and point at the sitemap.
pub fn robots(site_url: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n",
        site_url
    )
}

fn escape_xml(text: &str) -> Cow<'_, str> {
    if !text.contains(|c: char| matches!(c, '&' | '<' | '>' | '"' | '\'')) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
