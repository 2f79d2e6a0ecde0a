//! Defines the [`PostFileEntry`] type and the scan of the content directory
//! that produces it. The content directory is laid out as
//! `{content_root}/{category}/{slug}.md`.

use std::fmt;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

/// The extension of post source files.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// A raw post source file, as found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostFileEntry {
    /// The name of the category directory, untransliterated.
    pub category: String,

    /// The file name less [`MARKDOWN_EXTENSION`], untransliterated.
    pub slug: String,

    /// The file name including the extension.
    pub file_name: String,

    /// The full path of the source file.
    pub file_path: PathBuf,
}

/// Lists every post source file under `content_root`. Each immediate
/// subdirectory is a category; files directly under `content_root` and files
/// without the `.md` extension are skipped. A missing `content_root` isn't an
/// error: a fresh project simply has zero posts.
///
/// Entries come back in directory-enumeration order, which is
/// platform-defined. Callers are expected to re-sort.
pub fn list_post_files(content_root: &Path) -> Result<Vec<PostFileEntry>> {
    if !content_root.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for result in read_dir(content_root)? {
        let category_entry = result?;
        if !category_entry.file_type()?.is_dir() {
            continue;
        }
        let category = utf8_file_name(&category_entry)?;

        for result in read_dir(category_entry.path())? {
            let entry = result?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = utf8_file_name(&entry)?;
            if let Some(slug) = file_name.strip_suffix(MARKDOWN_EXTENSION) {
                entries.push(PostFileEntry {
                    category: category.clone(),
                    slug: slug.to_owned(),
                    file_path: entry.path(),
                    file_name,
                });
            }
        }
    }
    Ok(entries)
}

fn utf8_file_name(entry: &std::fs::DirEntry) -> Result<String> {
    entry
        .file_name()
        .into_string()
        .map_err(|_| Error::InvalidFileName(entry.path()))
}

/// Represents the result of a content-directory scan.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error scanning the content directory.
#[derive(Debug)]
pub enum Error {
    /// Returned when a category directory or post file name isn't valid
    /// UTF-8 and therefore can't become part of a URL.
    InvalidFileName(PathBuf),

    /// Returned for I/O errors reading a directory.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidFileName(path) => {
                write!(f, "invalid file name: {:?}", path)
            }
            Error::Io(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidFileName(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_yields_no_posts() -> Result<()> {
        let dir = TempDir::new()?;
        let posts = list_post_files(&dir.path().join("posts"))?;
        assert!(posts.is_empty());
        Ok(())
    }

    #[test]
    fn test_lists_markdown_files_in_category_dirs() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        fs::create_dir_all(root.join("技术"))?;
        fs::create_dir_all(root.join("life"))?;
        fs::write(root.join("技术/入门.md"), "---\ntitle: Intro\n---\n")?;
        fs::write(root.join("技术/notes.txt"), "not a post")?;
        fs::write(root.join("技术/draft.md.bak"), "not a post")?;
        fs::write(root.join("life/hello.md"), "hi")?;
        fs::write(root.join("README.md"), "top-level files are ignored")?;
        fs::create_dir_all(root.join("life/nested.md"))?;

        let mut posts = list_post_files(root)?;
        posts.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        assert_eq!(
            vec![
                PostFileEntry {
                    category: "life".to_owned(),
                    slug: "hello".to_owned(),
                    file_name: "hello.md".to_owned(),
                    file_path: root.join("life").join("hello.md"),
                },
                PostFileEntry {
                    category: "技术".to_owned(),
                    slug: "入门".to_owned(),
                    file_name: "入门.md".to_owned(),
                    file_path: root.join("技术").join("入门.md"),
                },
            ],
            posts
        );
        Ok(())
    }
}
