//! Adds `<noscript>` fallbacks for lazily loaded images in the generated
//! HTML so crawlers without JavaScript still see them.
//!
//! An image written as `<img data-src="/a.png">` (with no `src`) becomes
//! `<img data-src="/a.png"><noscript><img src="/a.png" /></noscript>`.

use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// How far past an image tag to look for an existing fallback.
const LOOKAHEAD: usize = 200;

/// Rewrites HTML documents. Construct once and reuse.
pub struct NoscriptInjector {
    lazy_img: Regex,
    src_attr: Regex,
}

impl NoscriptInjector {
    pub fn new() -> Result<NoscriptInjector> {
        Ok(NoscriptInjector {
            lazy_img: Regex::new(r#"<img\b([^>]*\sdata-src="([^"]+)"[^>]*)>"#)?,
            src_attr: Regex::new(r"(?:^|\s)src=")?,
        })
    }

    /// Returns `html` with a fallback after every `data-src` image that has
    /// no `src` and isn't already followed by one.
    pub fn inject(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for caps in self.lazy_img.captures_iter(html) {
            let (whole, attrs, src) = match (caps.get(0), caps.get(1), caps.get(2)) {
                (Some(whole), Some(attrs), Some(src)) => (whole, attrs, src.as_str()),
                _ => continue,
            };
            out.push_str(&html[last..whole.end()]);
            last = whole.end();

            if self.src_attr.is_match(attrs.as_str()) {
                continue;
            }
            let fallback = format!("<noscript><img src=\"{}\"", src);
            if lookahead(html, whole.end()).contains(&fallback) {
                continue;
            }
            out.push_str(&fallback);
            out.push_str(" /></noscript>");
        }
        out.push_str(&html[last..]);
        out
    }

    /// Patches every `.html` file under `dir` in place. Files that don't
    /// change aren't rewritten. Returns the paths that were patched.
    pub fn patch_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut patched = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "html") {
                continue;
            }
            let html = fs::read_to_string(path).map_err(|err| Error::Io {
                path: path.to_owned(),
                err,
            })?;
            let injected = self.inject(&html);
            if injected != html {
                fs::write(path, injected).map_err(|err| Error::Io {
                    path: path.to_owned(),
                    err,
                })?;
                debug!(path = %path.display(), "Injected noscript images");
                patched.push(path.to_owned());
            }
        }
        Ok(patched)
    }
}

/// Up to [`LOOKAHEAD`] bytes after `from`, cut back to a char boundary.
fn lookahead(html: &str, from: usize) -> &str {
    let mut end = (from + LOOKAHEAD).min(html.len());
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    &html[from..end]
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Returned when an image pattern fails to compile.
    Regex(regex::Error),

    /// Returned when the output directory can't be walked.
    Walk(walkdir::Error),

    /// Returned when an HTML file can't be read or written.
    Io { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Regex(err) => fmt::Display::fmt(err, f),
            Error::Walk(err) => fmt::Display::fmt(err, f),
            Error::Io { path, err } => write!(f, "patching '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Regex(err) => Some(err),
            Error::Walk(err) => Some(err),
            Error::Io { path: _, err } => Some(err),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Error {
        Error::Regex(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::Walk(err)
    }
}
