use inkwell::build::{build_site, BuildOptions};
use inkwell::config::Config;
use inkwell::env::Env;
use inkwell::loader::{ContentLoader, FsContentSource, LoadState};
use inkwell::route::{ssg_routes, Route, RouteTable};
use inkwell::slug::to_slug;
use std::error::Error;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn write(root: &Path, rel: &str, contents: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn project() -> Result<TempDir> {
    let dir = TempDir::new()?;
    let root = dir.path();
    write(
        root,
        "site.config.json",
        r#"{"url": "https://blog.dev/", "name": "Blog", "description": "Notes"}"#,
    )?;
    write(
        root,
        "posts/技术/入门.md",
        "---\ntitle: Intro\ndate: 2024-01-01\ndescription: First steps\n---\n# 1. Hello\n\nWorld\n",
    )?;
    write(
        root,
        "posts/life/hello.md",
        "---\ntitle: Hello\npublishDate: 2024-03-01\n---\nHi\n",
    )?;
    write(root, "posts/life/notes.txt", "ignored")?;
    write(
        root,
        "dist/index.html",
        "<html><body><img data-src=\"/cover.png\"></body></html>",
    )?;
    Ok(dir)
}

#[test]
fn test_build_site_end_to_end() -> Result<()> {
    let dir = project()?;
    let root = dir.path();
    let config = Config::from_parts(root, &Env::default())?;
    let options = BuildOptions {
        deny_collisions: true,
        now: "2025-01-01T00:00:00Z".parse()?,
    };
    let report = build_site(&config, &options)?;

    let category_slug = to_slug("技术");
    let slug = to_slug("入门");
    assert_eq!("jishu", category_slug);
    assert_eq!("rumen", slug);

    let ids: Vec<&str> = report.index.posts().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(vec!["life/hello", "技术/入门"], ids);

    let dist = root.join("dist");
    let sitemap = fs::read_to_string(dist.join("sitemap.xml"))?;
    assert!(sitemap.contains("  <url><loc>https://blog.dev</loc></url>\n"));
    assert!(sitemap.contains(
        "<url><loc>https://blog.dev/article/jishu/rumen</loc><lastmod>2024-01-01T00:00:00.000Z</lastmod></url>"
    ));

    assert_eq!(
        "User-agent: *\nAllow: /\nSitemap: https://blog.dev/sitemap.xml\n",
        fs::read_to_string(dist.join("robots.txt"))?
    );

    let rss = fs::read_to_string(dist.join("feed.xml"))?;
    let hello = rss.find("https://blog.dev/article/life/hello").unwrap_or(usize::MAX);
    let intro = rss.find("https://blog.dev/article/jishu/rumen").unwrap_or(usize::MAX);
    assert!(hello < intro);

    let atom = fs::read_to_string(dist.join("atom.xml"))?;
    assert!(atom.contains("https://blog.dev/atom.xml"));
    assert!(atom.contains("First steps"));

    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dist.join("posts-meta.json"))?)?;
    assert_eq!("技术/入门", meta[1]["id"]);
    assert_eq!("jishu", meta[1]["categorySlug"]);
    assert_eq!("/posts/技术/入门.md", meta[1]["path"]);
    assert_eq!("Intro", meta[1]["frontmatter"]["title"]);

    assert!(fs::read_to_string(dist.join("index.html"))?
        .contains("<noscript><img src=\"/cover.png\" /></noscript>"));
    Ok(())
}

#[test]
fn test_routes_resolve_to_posts() -> Result<()> {
    let dir = project()?;
    let root = dir.path();
    let config = Config::from_directory(&root.join("posts").join("技术"))?;
    assert_eq!(root, config.root_directory.as_path());
    let index = inkwell::index::PostIndex::build(&config.posts_source_directory)?;

    assert_eq!(
        vec![
            "/",
            "/article/life/hello",
            "/article/jishu/rumen",
            "/tags/all",
            "/tags/life",
            "/tags/jishu",
        ],
        ssg_routes(&index)
    );

    let table = RouteTable::from_index(&index);
    for route in ssg_routes(&index) {
        assert_ne!(Route::NotFound, table.resolve(&route), "{}", route);
    }
    assert_eq!(Route::NotFound, table.resolve("/article/unknown-category/unknown-id"));
    assert_eq!(Route::NotFound, table.resolve("/tags/nope"));

    let mut loader = ContentLoader::new(&index, FsContentSource::new(&config.root_directory));
    match loader.load("jishu", "rumen") {
        LoadState::Loaded { id, content } => {
            assert_eq!("技术/入门", id);
            assert_eq!("Hello", content.toc[0].text);
        }
        other => panic!("expected Loaded, got {:?}", other),
    }
    assert!(matches!(
        loader.load("unknown-category", "unknown-id"),
        LoadState::NotFound { .. }
    ));
    Ok(())
}
